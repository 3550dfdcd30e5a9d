//! Startup bootstrap: organisation inventory and webhook registration.

use board::{BoardClient, BoardError, Hook, HookId};
use serde::Serialize;
use tracing::{error, info, warn};

/// Events the organisation hook subscribes to.
pub const HOOK_EVENTS: [&str; 2] = ["pull_request", "issues"];

/// Result of [`ensure_org_hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "hook", rename_all = "snake_case")]
pub enum HookStatus {
    /// A hook with the delivery URL already existed; nothing was created.
    AlreadyRegistered(HookId),
    Created(HookId),
    /// The token lacks the scope to manage organisation hooks.
    Unauthorized,
}

/// Returns the id of the hook delivering to `url`, if any.
pub fn registered_hook(hooks: &[Hook], url: &str) -> Option<HookId> {
    hooks
        .iter()
        .find(|hook| hook.url.as_deref() == Some(url))
        .map(|hook| hook.id)
}

/// Makes sure an organisation hook delivers pull-request and issue events to `url`.
///
/// Insufficient token scope surfaces from the remote as "not found"; that is
/// reported as [`HookStatus::Unauthorized`] rather than an error so startup
/// can continue.
pub async fn ensure_org_hook(client: &dyn BoardClient, url: &str) -> Result<HookStatus, BoardError> {
    let hooks = match client.list_hooks().await {
        Ok(hooks) => hooks,
        Err(err) if err.is_not_found() => {
            error!(error = %err, "Unauthorized to list org hooks; increase token scope");
            return Ok(HookStatus::Unauthorized);
        }
        Err(err) => return Err(err),
    };

    if let Some(id) = registered_hook(&hooks, url) {
        info!(hook = %id, url, "Hook already created, skipping");
        return Ok(HookStatus::AlreadyRegistered(id));
    }

    match client.create_hook(url, &HOOK_EVENTS).await {
        Ok(hook) => {
            info!(hook = %hook.id, url, "Created org hook");
            Ok(HookStatus::Created(hook.id))
        }
        Err(err) if err.is_not_found() => {
            error!(error = %err, "Unauthorized to create org hook; increase token scope");
            Ok(HookStatus::Unauthorized)
        }
        Err(err) => Err(err),
    }
}

/// Logs the organisation's repositories and open boards.
///
/// Inventory is informational; a failure to list either is logged and
/// otherwise ignored.
pub async fn log_inventory(client: &dyn BoardClient) {
    match client.list_repositories().await {
        Ok(repositories) => {
            for repository in &repositories {
                info!(repo = %repository.full_name, "repo");
            }
        }
        Err(err) => warn!(error = %err, "Unable to list repos in org"),
    }
    match client.list_boards().await {
        Ok(boards) => {
            for board in &boards {
                info!(project = %board.name, id = %board.id, "project");
            }
        }
        Err(err) => warn!(error = %err, "Unable to list projects in org"),
    }
}
