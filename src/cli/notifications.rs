//! Notification inbox commands

use anyhow::{Result, bail};

use super::CliContext;

pub fn notification_list_command(ctx: &CliContext, unread_only: bool) -> Result<()> {
    let user_id = ctx
        .caller
        .require_user()
        .map_err(|e| ctx.engine_error(e))?;
    let notifications = ctx.sink.list_for_user(user_id, unread_only)?;

    ctx.print(&notifications, |notifications| {
        if notifications.is_empty() {
            println!("No notifications.");
            return;
        }
        for n in notifications {
            let marker = if n.is_read() { " " } else { "*" };
            println!(
                "{} #{} [{}] {} - {}",
                marker,
                n.id,
                n.notification.kind,
                n.notification.title,
                n.notification.message
            );
        }
    })
}

pub fn notification_read_command(ctx: &CliContext, notification_id: i64) -> Result<()> {
    let user_id = ctx
        .caller
        .require_user()
        .map_err(|e| ctx.engine_error(e))?;

    if !ctx.sink.mark_read(user_id, notification_id)? {
        bail!("Notification #{} not found or already read", notification_id);
    }
    println!("Marked notification #{} as read", notification_id);
    Ok(())
}
