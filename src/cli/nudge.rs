use anyhow::Result;

use keepsake::journal::types::Nudge;
use keepsake::MemoryService;

pub async fn generate(service: &MemoryService, user: &str) -> Result<()> {
    let nudges = service.generate_nudges(user, None).await?;
    if nudges.is_empty() {
        println!("No nudges this time.");
        return Ok(());
    }
    println!("Generated {} nudge(s):\n", nudges.len());
    for nudge in &nudges {
        print_nudge(nudge);
    }
    Ok(())
}

pub fn list(service: &MemoryService, user: &str, unread_only: bool) -> Result<()> {
    let nudges = service.list_nudges(user, unread_only)?;
    if nudges.is_empty() {
        println!("No active nudges.");
        return Ok(());
    }
    for nudge in &nudges {
        print_nudge(nudge);
    }
    Ok(())
}

fn print_nudge(nudge: &Nudge) {
    let status = if nudge.is_actioned {
        "actioned"
    } else if nudge.is_read {
        "read"
    } else {
        "new"
    };
    println!(
        "  [{}|{}] {} ({}, {})",
        nudge.priority, status, nudge.title, nudge.nudge_type, nudge.id
    );
    println!("      {}", nudge.message);
    if !nudge.related_people.is_empty() {
        println!("      people: {}", nudge.related_people.join(", "));
    }
    println!();
}
