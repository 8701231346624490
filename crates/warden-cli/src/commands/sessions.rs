use anyhow::Result;
use uuid::Uuid;

use crate::cli::OutputFormat;
use crate::commands::auth::explain;
use crate::output::{print_sessions, print_success};
use crate::session::{self, SessionOptions};

pub async fn list(opts: SessionOptions, format: OutputFormat) -> Result<()> {
    let context = session::resume(opts).await?;
    let me = context.whoami().await.map_err(explain)?;
    print_sessions(&me, format)
}

pub async fn revoke(opts: SessionOptions, session_id: Uuid) -> Result<()> {
    let context = session::resume(opts).await?;
    let own = context.session_id().await == session_id;
    context.revoke_session(session_id).await.map_err(explain)?;
    if own {
        print_success(&format!("Revoked session {session_id} (this was the current session)"));
    } else {
        print_success(&format!("Revoked session {session_id}"));
    }
    Ok(())
}
