use anyhow::Result;

use keepsake::journal::types::NewMemory;
use keepsake::MemoryService;

/// Record a new memory and print the enrichment the AI derived for it.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    service: &MemoryService,
    user: &str,
    content: String,
    title: Option<String>,
    people: Vec<String>,
    tags: Vec<String>,
    location: Option<String>,
) -> Result<()> {
    let memory = service
        .create_memory(
            user,
            NewMemory {
                content,
                title,
                people,
                tags,
                location,
                ..NewMemory::default()
            },
        )
        .await?;

    println!("Remembered ({})", memory.id);
    println!("  summary: {}", memory.summary);
    println!(
        "  feeling: {} ({}, intensity {})",
        memory.emotion.primary, memory.emotion.valence, memory.emotion.intensity
    );
    println!("  mood:    {}/10", memory.mood);
    if !memory.tags.is_empty() {
        println!("  tags:    {}", memory.tags.join(", "));
    }

    Ok(())
}
