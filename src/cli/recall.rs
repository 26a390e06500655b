use anyhow::Result;

use keepsake::MemoryService;

/// Run a semantic query from the terminal.
pub async fn run(
    service: &MemoryService,
    user: &str,
    query: &str,
    limit: Option<usize>,
) -> Result<()> {
    let outcome = service.query_memories(user, query, limit, None).await?;

    if outcome.matches.is_empty() {
        println!("{}", outcome.explanation);
        return Ok(());
    }

    println!(
        "Found {} memor{} (confidence {:.2})\n",
        outcome.matches.len(),
        if outcome.matches.len() == 1 { "y" } else { "ies" },
        outcome.confidence
    );

    for (i, hit) in outcome.matches.iter().enumerate() {
        let m = &hit.memory;
        let title = m.title.as_deref().unwrap_or("(untitled)");
        println!(
            "  {}. {} — {:.2} similarity ({})",
            i + 1,
            title,
            hit.similarity,
            m.created_at
        );
        println!("     {}", m.summary);
        println!();
    }

    println!("{}", outcome.explanation);
    Ok(())
}
