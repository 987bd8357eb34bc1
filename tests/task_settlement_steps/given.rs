//! Given steps for task settlement BDD scenarios.

use super::world::{SettlementWorld, client, developer, run_async};
use bountyforge::task::{
    domain::{Caller, EscrowOperation, PullRequestState, PullRequestSummary},
    ports::ExternalFailureKind,
    services::CreateTaskRequest,
};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given("a client has posted a task worth {value:i64}")]
fn client_has_posted_task(world: &mut SettlementWorld, value: i64) -> Result<(), eyre::Report> {
    let created = run_async(
        world
            .orchestrator
            .create_task(&client()?, CreateTaskRequest::new("Port the exporter", value)),
    )
    .wrap_err("post task for settlement scenario")?;
    world.task = Some(created);
    Ok(())
}

#[given(r#"developer "{id}" has applied"#)]
fn developer_has_applied(world: &mut SettlementWorld, id: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let applied = run_async(world.orchestrator.apply(task_id, &developer(&id)?))
        .wrap_err("developer applies in scenario setup")?;
    world.task = Some(applied);
    Ok(())
}

#[given(r#"the client has assigned "{id}""#)]
fn client_has_assigned(world: &mut SettlementWorld, id: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let assignee = developer(&id)?;
    let assigned = run_async(
        world
            .orchestrator
            .assign(task_id, &client()?, assignee.id().clone()),
    )
    .wrap_err("assign developer in scenario setup")?;
    world.task = Some(assigned);
    Ok(())
}

#[given(r#"the client has tried to assign "{id}""#)]
fn client_has_tried_to_assign(world: &mut SettlementWorld, id: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let assignee = developer(&id)?;
    let result = run_async(
        world
            .orchestrator
            .assign(task_id, &client()?, assignee.id().clone()),
    );
    eyre::ensure!(result.is_err(), "assignment of {id} was expected to fail");
    Ok(())
}

#[given("the developer has submitted the work for review")]
fn work_submitted(world: &mut SettlementWorld) -> Result<(), eyre::Report> {
    let task = world.task()?;
    let assignee = task
        .assigned_developer()
        .cloned()
        .ok_or_else(|| eyre::eyre!("task has no assigned developer"))?;
    let caller = Caller::developer(assignee);
    let task_id = task.id();
    run_async(world.orchestrator.start_work(task_id, &caller)).wrap_err("start work")?;
    let submitted = run_async(world.orchestrator.submit_for_review(task_id, &caller))
        .wrap_err("submit work for review")?;
    world.task = Some(submitted);
    Ok(())
}

fn open_pull_request(world: &SettlementWorld, state: PullRequestState) -> Result<(), eyre::Report> {
    let workspace = world
        .task()?
        .workspace()
        .ok_or_else(|| eyre::eyre!("task has no workspace"))?;
    let number = world.host.open_pull_request(workspace, "Exporter port")?;
    world.host.upsert_pull_request(
        workspace,
        PullRequestSummary::new(number, "Exporter port").with_state(state),
    )?;
    Ok(())
}

#[given("the pull request for the work has been merged")]
fn pull_request_merged(world: &mut SettlementWorld) -> Result<(), eyre::Report> {
    open_pull_request(world, PullRequestState::Merged)
}

#[given("the pull request for the work is awaiting review")]
fn pull_request_awaiting_review(world: &mut SettlementWorld) -> Result<(), eyre::Report> {
    open_pull_request(world, PullRequestState::Open)
}

#[given("the escrow refund fails {times:usize} times")]
fn escrow_refund_fails(world: &mut SettlementWorld, times: usize) -> Result<(), eyre::Report> {
    world
        .escrow
        .fail_next(EscrowOperation::Refund, ExternalFailureKind::Unavailable, times)?;
    Ok(())
}

#[given("the escrow deposit is rejected once")]
fn escrow_deposit_rejected(world: &mut SettlementWorld) -> Result<(), eyre::Report> {
    world
        .escrow
        .fail_next(EscrowOperation::Deposit, ExternalFailureKind::Rejected, 1)?;
    Ok(())
}
