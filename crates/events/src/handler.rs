/// Execute an aggregate command deterministically (no IO, no async).
///
/// The canonical event-sourced lifecycle in one step:
///
/// 1. **Decide**: `aggregate.handle(command)` returns events (pure, no mutation)
/// 2. **Evolve**: each event is applied via `aggregate.apply(event)`
///
/// The aggregate is mutated in place and remains responsible for its own
/// version tracking during `apply()`. Useful for tests and inline workflows;
/// the full pipeline (persistence, publication, optimistic concurrency) is
/// `CommandDispatcher::dispatch()` in the infra crate.
pub fn execute<A>(
    aggregate: &mut A,
    command: &A::Command,
) -> Result<Vec<A::Event>, A::Error>
where
    A: tadbir_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
