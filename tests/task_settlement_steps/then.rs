//! Then steps for task settlement BDD scenarios.

use super::world::{SettlementWorld, run_async};
use bountyforge::task::domain::{MinorUnits, ParticipantId, Payout, TaskState};
use eyre::WrapErr;
use rstest_bdd_macros::then;

#[then(r#"the task state is "{state}""#)]
fn task_state_is(world: &SettlementWorld, state: String) -> Result<(), eyre::Report> {
    let expected_state = TaskState::try_from(state.as_str())
        .map_err(|err| eyre::eyre!("invalid expected state in scenario: {err}"))?;
    let stored = run_async(world.orchestrator.get_task(world.task_id()?))
        .wrap_err("load task for state check")?;

    eyre::ensure!(
        stored.state() == expected_state,
        "expected state {}, found {}",
        expected_state.as_str(),
        stored.state().as_str()
    );
    Ok(())
}

#[then("the escrow holds {amount:u64}")]
fn escrow_holds(world: &SettlementWorld, amount: u64) -> Result<(), eyre::Report> {
    let held = world.escrow.held(world.task_id()?)?;
    eyre::ensure!(
        held == MinorUnits::new(amount),
        "expected {amount} in escrow, found {held}"
    );
    Ok(())
}

#[then("the developer is paid {developer:u64} and the platform {platform:u64}")]
fn payout_split(world: &SettlementWorld, developer: u64, platform: u64) -> Result<(), eyre::Report> {
    let expected = Payout {
        developer: MinorUnits::new(developer),
        platform: MinorUnits::new(platform),
    };
    let payout = world
        .escrow
        .payout(world.task_id()?)?
        .ok_or_else(|| eyre::eyre!("escrow was not released"))?;
    eyre::ensure!(payout == expected, "expected {expected:?}, found {payout:?}");
    Ok(())
}

#[then("the workspace has been torn down")]
fn workspace_torn_down(world: &SettlementWorld) -> Result<(), eyre::Report> {
    let task = world.task()?;
    eyre::ensure!(task.workspace().is_none(), "task still references a workspace");
    let torn_down = world.host.workspaces_torn_down()?;
    eyre::ensure!(torn_down == 1, "expected one teardown, found {torn_down}");
    Ok(())
}

#[then(r#"only "{id}" can access the workspace"#)]
fn only_collaborator(world: &SettlementWorld, id: String) -> Result<(), eyre::Report> {
    let task = world.task()?;
    let workspace = task
        .workspace()
        .ok_or_else(|| eyre::eyre!("task has no workspace"))?;
    let collaborators = world.host.collaborators(workspace)?;
    let expected = ParticipantId::new(id)?;
    eyre::ensure!(
        collaborators.len() == 1 && collaborators.contains(&expected),
        "expected only {expected} on the workspace, found {collaborators:?}"
    );
    Ok(())
}

#[then("exactly one refund was issued")]
fn one_refund(world: &SettlementWorld) -> Result<(), eyre::Report> {
    let refunds = world.escrow.refunds()?;
    eyre::ensure!(refunds == 1, "expected one refund, found {refunds}");
    Ok(())
}

#[then(r#"the request fails with "{kind}""#)]
fn request_fails_with(world: &SettlementWorld, kind: String) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing request result"))?;

    match result {
        Err(err) if err.kind().as_str() == kind => Ok(()),
        other => Err(eyre::eyre!("expected a {kind} failure, got {other:?}")),
    }
}
