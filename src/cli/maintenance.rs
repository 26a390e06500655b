use anyhow::Result;

use keepsake::ai::analysis::MoodTrend;
use keepsake::MemoryService;

/// Rebuild the vector index from the authoritative store.
pub fn reindex(service: &MemoryService, user: &str) -> Result<()> {
    let count = service.reindex_user(user)?;
    println!("Rebuilt index with {count} entr{}.", if count == 1 { "y" } else { "ies" });
    Ok(())
}

/// Analyze emotional patterns over recent memories.
pub async fn patterns(service: &MemoryService, user: &str) -> Result<()> {
    let analysis = service.analyze_patterns(user).await?;

    let trend = match analysis.mood_trend {
        MoodTrend::Improving => "improving",
        MoodTrend::Declining => "declining",
        MoodTrend::Stable => "stable",
    };
    println!("Mood trend: {trend}");
    if !analysis.dominant_emotions.is_empty() {
        println!("Dominant emotions: {}", analysis.dominant_emotions.join(", "));
    }
    if !analysis.emotional_gaps.is_empty() {
        println!("Under-represented: {}", analysis.emotional_gaps.join(", "));
    }
    for rec in &analysis.recommendations {
        println!("  - {rec}");
    }

    Ok(())
}
