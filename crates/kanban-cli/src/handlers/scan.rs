use crate::context::CliContext;
use crate::output;
use chrono::{DateTime, Utc};
use kanban_realtime::{dispatch_channel, ReminderScanner, ScanReport, ServerEvent};
use serde::Serialize;

#[derive(Serialize)]
struct ScanOutput {
    #[serde(flatten)]
    report: ScanReport,
    events: Vec<ServerEvent>,
}

/// Scan the data file until nothing is due. Claimed reminders are written
/// back as sent, and the events the dispatcher would push are printed.
pub async fn handle(ctx: &mut CliContext, now: Option<DateTime<Utc>>) -> anyhow::Result<()> {
    let now = now.unwrap_or_else(Utc::now);
    let config = ctx.config();
    let (queue, mut receiver) = dispatch_channel(config.dispatcher.queue_capacity);
    let scanner = ReminderScanner::new(ctx.store().clone(), queue, &config.scanner);

    let mut report = ScanReport::default();
    let mut events = Vec::new();
    loop {
        let pass = scanner.run_once(now).await?;
        while let Some(request) = receiver.try_recv() {
            events.push(request.event);
        }
        report.absorb(pass);
        if pass.claimed == 0 {
            break;
        }
    }
    drop(scanner);

    if report.claimed > 0 {
        ctx.save().await?;
    }
    output::output_success(ScanOutput { report, events })
}
