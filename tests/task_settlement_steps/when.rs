//! When steps for task settlement BDD scenarios.

use super::world::{SettlementWorld, client, developer, run_async};
use bountyforge::task::services::CreateTaskRequest;
use rstest_bdd_macros::when;

#[when("a client posts a task worth {value:i64}")]
fn client_posts_task(world: &mut SettlementWorld, value: i64) -> Result<(), eyre::Report> {
    let result = run_async(
        world
            .orchestrator
            .create_task(&client()?, CreateTaskRequest::new("Port the exporter", value)),
    );
    world.record(result);
    Ok(())
}

#[when(r#"the client assigns "{id}""#)]
fn client_assigns(world: &mut SettlementWorld, id: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let assignee = developer(&id)?;
    let result = run_async(
        world
            .orchestrator
            .assign(task_id, &client()?, assignee.id().clone()),
    );
    world.record(result);
    Ok(())
}

#[when("the client approves the work")]
fn client_approves(world: &mut SettlementWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let result = run_async(world.orchestrator.approve(task_id, &client()?));
    world.record(result);
    Ok(())
}

#[when("the client cancels the task")]
fn client_cancels(world: &mut SettlementWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let result = run_async(world.orchestrator.cancel(task_id, &client()?));
    world.record(result);
    Ok(())
}
