use crate::cli::ReminderAction;
use crate::context::CliContext;
use crate::output;
use kanban_domain::{Reminder, ReminderStore};

pub async fn handle(ctx: &mut CliContext, action: ReminderAction) -> anyhow::Result<()> {
    match action {
        ReminderAction::Add {
            card_id,
            user_id,
            at,
            reminder_type,
        } => {
            let reminder = ctx
                .store()
                .schedule(Reminder::new(card_id, user_id, at, reminder_type))
                .await?;
            ctx.save().await?;
            output::output_success(&reminder)
        }
        ReminderAction::List { card_id } => {
            let reminders = ctx.store().reminders_for_card(card_id).await?;
            output::output_list(reminders)
        }
        ReminderAction::Cancel { id } => {
            ctx.store().cancel(id).await?;
            ctx.save().await?;
            output::output_success(serde_json::json!({ "cancelled": id.to_string() }))
        }
    }
}
