// Session tests against a scripted in-memory backend

use proptest::prelude::*;
use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};
use urcltty::backend::value::Value;
use urcltty::backend::{Backend, EvalError, ExecError, LoadError, ModuleSource};
use urcltty::session::modules::{LoadDecision, Rebuild};
use urcltty::session::scheduler::{RunState, Signals};
use urcltty::session::{Session, StepOutcome};
use urcltty::snapshot::{Change, MemoryRow};

const INTERVAL: Duration = Duration::from_millis(10);

type FakeScope = FxHashMap<String, Value>;

/// Backend whose modules are `name=value` lines and whose step is a plain function.
///
/// Values: integers, `true`/`false`, `a;b;c` lists of ints, `k:v,k:v` int maps and
/// `rom:` followed by `;`-separated instruction sources. A line reading `fail`
/// raises a load error; lines before it stay bound.
struct FakeBackend {
    step: fn(&mut FakeScope) -> Result<(), ExecError>,
}

fn parse_value(text: &str) -> Value {
    if let Some(rom) = text.strip_prefix("rom:") {
        return Value::List(
            rom.split(';')
                .map(|source| {
                    let mut fields = FxHashMap::default();
                    fields.insert("Source".to_string(), Value::Text(source.to_string()));
                    Value::Object(fields)
                })
                .collect(),
        );
    }
    if text.contains(':') {
        return Value::Map(
            text.split(',')
                .map(|pair| {
                    let (k, v) = pair.split_once(':').unwrap();
                    (k.parse().unwrap(), Value::Int(v.parse().unwrap()))
                })
                .collect(),
        );
    }
    if text.contains(';') {
        return Value::List(text.split(';').map(|v| Value::Int(v.parse().unwrap())).collect());
    }
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Int(text.parse().unwrap()),
    }
}

impl Backend for FakeBackend {
    type Scope = FakeScope;

    fn create_scope(&self) -> FakeScope {
        FakeScope::default()
    }

    fn load_source(&self, scope: &mut FakeScope, source: &ModuleSource) -> Result<(), LoadError> {
        for line in source.text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line == "fail" {
                return Err(LoadError::new(format!("{} failed", source.name)));
            }
            let (name, value) = line.split_once('=').unwrap();
            scope.insert(name.to_string(), parse_value(value));
        }
        Ok(())
    }

    fn read_variable(&self, scope: &FakeScope, name: &str) -> Option<Value> {
        scope.get(name).cloned()
    }

    fn variable_names(&self, scope: &FakeScope) -> Vec<String> {
        scope.keys().cloned().collect()
    }

    fn set_variable(&self, scope: &mut FakeScope, name: &str, value: Value) {
        scope.insert(name.to_string(), value);
    }

    fn call_routine(&self, scope: &mut FakeScope, name: &str) -> Result<(), ExecError> {
        assert_eq!(name, "Execute");
        (self.step)(scope)
    }

    fn evaluate_expression(&self, scope: &FakeScope, expr: &str) -> Result<Value, EvalError> {
        let lookup = |name: &str| {
            scope
                .get(name)
                .ok_or_else(|| EvalError::Undefined(name.to_string()))
        };
        if let Some(name) = expr.strip_prefix("len(").and_then(|e| e.strip_suffix(')')) {
            let list = lookup(name)?
                .as_list()
                .ok_or_else(|| EvalError::Unavailable("not a list".to_string()))?;
            return Ok(Value::Int(list.len() as i64));
        }
        let inner = expr
            .strip_prefix("str(")
            .and_then(|e| e.strip_suffix(')'))
            .ok_or_else(|| EvalError::Unavailable(expr.to_string()))?;
        let (name, rest) = inner.split_once('[').unwrap();
        let (index, field) = rest.split_once(']').unwrap();
        let item = lookup(name)?
            .as_list()
            .and_then(|items| items.get(index.parse::<usize>().unwrap()))
            .ok_or_else(|| EvalError::Unavailable("index out of range".to_string()))?;
        let value = match field.strip_prefix('.') {
            Some(field) => item
                .field(field)
                .ok_or_else(|| EvalError::Unavailable(field.to_string()))?,
            None => item,
        };
        Ok(Value::Text(value.render()))
    }
}

fn noop(_: &mut FakeScope) -> Result<(), ExecError> {
    Ok(())
}

/// Counts steps in `n` and halts on the fourth
fn halt_after_four(scope: &mut FakeScope) -> Result<(), ExecError> {
    let n = scope.get("n").and_then(Value::as_int).unwrap_or(0) + 1;
    scope.insert("n".to_string(), Value::Int(n));
    scope.insert("HALT".to_string(), Value::Bool(n == 4));
    Ok(())
}

fn bump_acc(scope: &mut FakeScope) -> Result<(), ExecError> {
    let acc = scope.get("acc").and_then(Value::as_int).unwrap_or(0);
    scope.insert("acc".to_string(), Value::Int(acc + 1));
    scope.insert("tmp".to_string(), Value::Int(5));
    Ok(())
}

fn raise(_: &mut FakeScope) -> Result<(), ExecError> {
    Err(ExecError::new("boom"))
}

fn raise_break(scope: &mut FakeScope) -> Result<(), ExecError> {
    scope.insert("BREAK".to_string(), Value::Bool(true));
    Ok(())
}

fn session(step: fn(&mut FakeScope) -> Result<(), ExecError>) -> Session<FakeBackend> {
    Session::new(FakeBackend { step }, INTERVAL)
}

fn load(session: &mut Session<FakeBackend>, name: &str, text: &str) -> bool {
    session.load_file(ModuleSource::inline(name, text), &mut LoadDecision::Abort)
}

/// Feed `count` ticks spaced one interval apart and count the steps that ran
fn run_ticks(session: &mut Session<FakeBackend>, start: Instant, count: u32) -> usize {
    (1..=count)
        .filter_map(|k| session.tick(start + INTERVAL * k))
        .count()
}

#[test]
fn test_registers_are_ordered_by_length_then_name() {
    let mut session = session(noop);
    assert!(load(&mut session, "regs", "alpha=1\nx=2\nb=3"));

    let names: Vec<&str> = session
        .frame()
        .snapshot
        .registers
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(names, ["b", "x", "alpha"]);
}

#[test]
fn test_only_int_and_bool_variables_are_registers() {
    let mut session = session(noop);
    load(&mut session, "mixed", "flag=true\nn=3\nSTACK=1;2\nRAM=0:1");

    let snapshot = &session.frame().snapshot;
    assert!(snapshot.register("flag").is_some());
    assert!(snapshot.register("n").is_some());
    assert!(snapshot.register("STACK").is_none());
    assert!(snapshot.register("RAM").is_none());
    assert_eq!(snapshot.register("flag").unwrap().text(), "true");
}

#[test]
fn test_step_classifies_new_changed_and_unchanged() {
    let mut session = session(bump_acc);
    load(&mut session, "prog", "acc=0\nip=3\nHALT=false");
    assert_eq!(session.frame().delta.register("acc"), Some(Change::New));

    let outcome = session.step();
    assert!(matches!(outcome, StepOutcome::Completed(_)));

    let delta = &session.frame().delta;
    assert_eq!(delta.register("acc"), Some(Change::Changed));
    assert_eq!(delta.register("ip"), Some(Change::Unchanged));
    assert_eq!(delta.register("tmp"), Some(Change::New));
}

#[test]
fn test_memory_rows_mark_gaps() {
    let mut session = session(noop);
    load(&mut session, "mem", "RAM=0:1,1:2,5:9");

    let rows = &session.frame().snapshot.memory;
    assert_eq!(
        rows,
        &vec![
            MemoryRow::Cell { address: 0, value: "1".to_string() },
            MemoryRow::Cell { address: 1, value: "2".to_string() },
            MemoryRow::Gap,
            MemoryRow::Cell { address: 5, value: "9".to_string() },
        ]
    );
    assert_eq!(rows[2].to_string(), "...");
    assert_eq!(rows[3].to_string(), "5: 9");
}

#[test]
fn test_memory_starting_above_zero_begins_with_gap() {
    let mut session = session(noop);
    load(&mut session, "mem", "RAM=3:7");
    assert_eq!(session.frame().snapshot.memory[0], MemoryRow::Gap);
}

#[test]
fn test_stack_pointer_selects_active_cell() {
    let mut session = session(noop);
    load(&mut session, "stack", "STACK=7;8;9\nSP=-1");

    let stack = session.frame().snapshot.stack.as_ref().unwrap();
    assert_eq!(stack.cells, ["7", "8", "9"]);
    assert_eq!(stack.active(), Some(0));

    load(&mut session, "empty", "SP=0");
    let stack = session.frame().snapshot.stack.as_ref().unwrap();
    assert_eq!(stack.active(), None);
}

#[test]
fn test_program_listing_follows_ip() {
    let mut session = session(noop);
    load(&mut session, "rom", "ROM=rom:IMM R1 1;ADD R1 R1 R1;HLT\nIP=1");

    let program = session.frame().snapshot.program.as_ref().unwrap();
    assert_eq!(program.instructions, ["IMM R1 1", "ADD R1 R1 R1", "HLT"]);
    assert_eq!(program.current(), Some(1));
}

#[test]
fn test_missing_categories_fall_back_independently() {
    let mut session = session(noop);
    load(&mut session, "partial", "STACK=1;2\nRAM=0:4");

    let snapshot = &session.frame().snapshot;
    // No SP, no ROM
    assert!(snapshot.stack.is_none());
    assert!(snapshot.program.is_none());
    assert_eq!(snapshot.memory.len(), 1);
}

#[test]
fn test_continuous_run_stops_after_halt() {
    let mut session = session(halt_after_four);
    load(&mut session, "prog", "n=0\nHALT=false");
    let before = session.revision();

    let start = Instant::now();
    session.start_continuous(start);
    assert_eq!(session.run_state(), RunState::ContinuousRunning);

    let steps = run_ticks(&mut session, start, 10);
    assert_eq!(steps, 4);
    assert_eq!(session.revision(), before + 4);
    assert!(!session.scheduler().is_running());
    assert_eq!(session.run_state(), RunState::Halted);
}

#[test]
fn test_absent_halt_counts_as_halted() {
    let mut session = session(noop);
    load(&mut session, "prog", "x=1");

    let start = Instant::now();
    session.start_continuous(start);
    let steps = run_ticks(&mut session, start, 5);

    assert_eq!(steps, 1);
    assert_eq!(session.run_state(), RunState::Halted);
}

#[test]
fn test_break_stops_continuous_run_without_halting() {
    let mut session = session(raise_break);
    load(&mut session, "prog", "HALT=false");

    let start = Instant::now();
    session.start_continuous(start);
    let steps = run_ticks(&mut session, start, 5);

    assert_eq!(steps, 1);
    assert_eq!(session.run_state(), RunState::Idle);
}

#[test]
fn test_no_tick_before_first_interval() {
    let mut session = session(noop);
    load(&mut session, "prog", "HALT=false");

    let start = Instant::now();
    session.start_continuous(start);
    assert!(session.tick(start).is_none());
    assert!(session.tick(start + INTERVAL / 2).is_none());
    assert!(session.tick(start + INTERVAL).is_some());
}

#[test]
fn test_interrupt_stops_ticks() {
    let mut session = session(noop);
    load(&mut session, "prog", "HALT=false");

    let start = Instant::now();
    session.start_continuous(start);
    session.interrupt();
    assert_eq!(run_ticks(&mut session, start, 3), 0);
    assert_eq!(session.run_state(), RunState::Idle);
}

#[test]
fn test_exec_error_stops_run_and_still_publishes() {
    let mut session = session(raise);
    load(&mut session, "prog", "HALT=false");
    let before = session.revision();

    let start = Instant::now();
    session.start_continuous(start);
    let outcome = session.tick(start + INTERVAL);

    assert_eq!(outcome, Some(StepOutcome::Failed(ExecError::new("boom"))));
    assert!(!session.scheduler().is_running());
    assert_eq!(session.revision(), before + 1);
    // STEP was set before the routine raised
    assert_eq!(
        session.frame().snapshot.register("STEP").map(|r| r.text()),
        Some("true".to_string())
    );
}

#[test]
fn test_manual_step_reports_signals() {
    let mut session = session(halt_after_four);
    load(&mut session, "prog", "n=3\nHALT=false");

    let outcome = session.step();
    assert_eq!(
        outcome,
        StepOutcome::Completed(Signals {
            halted: true,
            broke: false
        })
    );
}

#[test]
fn test_aborted_open_leaves_scope_untouched() {
    let mut session = session(noop);
    load(&mut session, "first", "x=1");
    let revision = session.revision();

    assert!(!load(&mut session, "broken", "y=5\nfail"));

    assert_eq!(session.modules().len(), 1);
    assert_eq!(session.revision(), revision);
    assert!(!session.scope().contains_key("y"));
}

#[test]
fn test_continued_open_keeps_partial_bindings() {
    let mut session = session(noop);
    let mut asked = 0;
    let mut prompt = |_: &ModuleSource, _: &LoadError| {
        asked += 1;
        LoadDecision::Continue
    };

    assert!(session.load_file(ModuleSource::inline("broken", "y=5\nfail\nz=1"), &mut prompt));
    assert_eq!(asked, 1);
    assert_eq!(session.modules().len(), 1);
    assert!(session.scope().contains_key("y"));
    assert!(!session.scope().contains_key("z"));
}

#[test]
fn test_reload_abort_empties_everything() {
    let mut session = session(noop);
    load(&mut session, "good", "x=1");
    session.load_file(ModuleSource::inline("bad", "fail"), &mut LoadDecision::Continue);
    assert_eq!(session.modules().len(), 2);

    let result = session.reload(&mut LoadDecision::Abort);

    assert_eq!(result, Rebuild::Aborted);
    assert!(session.modules().is_empty());
    assert!(session.scope().is_empty());
    assert!(session.frame().snapshot.is_empty());
}

#[test]
fn test_unloading_last_module_empties_snapshot() {
    let mut session = session(noop);
    load(&mut session, "only", "x=1\nSTACK=1\nSP=0\nRAM=0:1");

    let result = session.unload_at(0, &mut LoadDecision::Abort);

    assert_eq!(result, Rebuild::Completed);
    assert!(session.modules().is_empty());
    assert!(session.frame().snapshot.is_empty());
}

#[test]
fn test_unload_out_of_range_changes_nothing() {
    let mut session = session(noop);
    load(&mut session, "only", "x=1");
    let revision = session.revision();

    assert_eq!(session.unload_at(3, &mut LoadDecision::Abort), Rebuild::Unchanged);
    assert_eq!(session.revision(), revision);
    assert_eq!(session.modules().len(), 1);
}

#[test]
fn test_unload_rebuilds_from_remaining_modules_in_order() {
    let mut session = session(noop);
    load(&mut session, "a", "x=1");
    load(&mut session, "b", "x=2\ny=2");
    load(&mut session, "c", "x=3");

    session.unload_at(2, &mut LoadDecision::Abort);

    assert_eq!(session.scope().get("x"), Some(&Value::Int(2)));
    let names: Vec<&str> = session.modules().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn test_incremental_load_keeps_diff_history_but_rebuild_resets_it() {
    let mut session = session(noop);
    load(&mut session, "a", "x=1");
    load(&mut session, "b", "x=2");
    assert_eq!(session.frame().delta.register("x"), Some(Change::Changed));

    session.reload(&mut LoadDecision::Abort);
    assert_eq!(session.frame().delta.register("x"), Some(Change::New));
}

#[test]
fn test_rebuild_stops_continuous_run() {
    let mut session = session(noop);
    load(&mut session, "a", "HALT=false");
    session.start_continuous(Instant::now());

    session.reload(&mut LoadDecision::Abort);
    assert!(!session.scheduler().is_running());
}

fn module_text(values: &[i64]) -> String {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| format!("v{}={}", i, v))
        .collect::<Vec<_>>()
        .join("\n")
}

proptest! {
    #[test]
    fn prop_reload_matches_fresh_load(
        first in prop::collection::vec(-100i64..100, 0..6),
        second in prop::collection::vec(-100i64..100, 0..6),
    ) {
        let mut loaded = session(noop);
        load(&mut loaded, "first", &module_text(&first));
        load(&mut loaded, "second", &module_text(&second));
        loaded.reload(&mut LoadDecision::Abort);

        let mut fresh = session(noop);
        load(&mut fresh, "first", &module_text(&first));
        load(&mut fresh, "second", &module_text(&second));

        prop_assert_eq!(&loaded.frame().snapshot, &fresh.frame().snapshot);
        prop_assert_eq!(loaded.scope(), fresh.scope());
    }

    #[test]
    fn prop_memory_rows_keep_every_address_in_order(
        addresses in prop::collection::btree_set(0i64..50, 0..12),
    ) {
        let cells: Vec<(i64, String)> = addresses.iter().map(|a| (*a, a.to_string())).collect();
        let rows = urcltty::snapshot::memory_rows(cells);

        let listed: Vec<i64> = rows
            .iter()
            .filter_map(|row| match row {
                MemoryRow::Cell { address, .. } => Some(*address),
                MemoryRow::Gap => None,
            })
            .collect();
        prop_assert_eq!(listed, addresses.iter().copied().collect::<Vec<_>>());
        // Never two gaps in a row
        prop_assert!(rows.windows(2).all(|w| !(w[0] == MemoryRow::Gap && w[1] == MemoryRow::Gap)));
    }
}
