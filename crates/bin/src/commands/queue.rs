//! Device-side queue commands.

use std::sync::Arc;

use latemark::{LateMarker, SystemClock, format_millis, queue::QueueStore};

use crate::cli::{MarkArgs, QueueArgs};
use crate::output::{OutputFormat, print_table};
use crate::storage::open_queue;

/// Run the `mark` command
pub async fn mark(args: &MarkArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let queue = open_queue(&args.queue).await?;
    let marker = LateMarker::new(queue.clone(), Arc::new(SystemClock));

    let date = args
        .date
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    let local_id = marker
        .mark_late(args.subject, args.context, args.actor, &date)
        .await?;
    let pending = queue.len().await?;

    match format {
        OutputFormat::Human => {
            println!("Queued mark {local_id} for subject {} on {date} ({pending} pending)", args.subject);
        }
        OutputFormat::Json => {
            let body = serde_json::json!({
                "localId": local_id,
                "subjectId": args.subject,
                "contextId": args.context,
                "actorId": args.actor,
                "eventDate": date,
                "pending": pending,
            });
            println!("{}", serde_json::to_string(&body)?);
        }
    }
    Ok(())
}

/// Run the `pending` command
pub async fn pending(args: &QueueArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let queue = open_queue(args).await?;
    let items = queue.list_pending().await?;

    match format {
        OutputFormat::Human => {
            if items.is_empty() {
                println!("No pending marks.");
                return Ok(());
            }

            let rows: Vec<Vec<String>> = items
                .iter()
                .map(|item| {
                    vec![
                        item.local_id.to_string(),
                        item.record.subject_id.to_string(),
                        item.record.context_id.to_string(),
                        item.record.actor_id.to_string(),
                        item.record.event_date.to_string(),
                        format_millis(item.created_at_ms),
                    ]
                })
                .collect();
            print_table(
                &["ID", "SUBJECT", "CONTEXT", "ACTOR", "DATE", "QUEUED AT"],
                &rows,
            );
        }
        OutputFormat::Json => {
            let entries: Vec<_> = items
                .iter()
                .map(|item| {
                    serde_json::json!({
                        "localId": item.local_id,
                        "record": item.record,
                        "createdAtMs": item.created_at_ms,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string(&entries)?);
        }
    }
    Ok(())
}

/// Run the `purge` command
pub async fn purge(args: &QueueArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let queue = open_queue(args).await?;
    let discarded = queue.len().await?;
    queue.clear_all().await?;
    tracing::warn!(discarded, "Queue purged without syncing");

    match format {
        OutputFormat::Human => println!("Discarded {discarded} pending marks."),
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "discarded": discarded }));
        }
    }
    Ok(())
}
