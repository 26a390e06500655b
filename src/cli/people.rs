use anyhow::Result;

use keepsake::MemoryService;

pub fn list(service: &MemoryService, user: &str) -> Result<()> {
    let people = service.list_people(user)?;
    if people.is_empty() {
        println!("No people recorded yet.");
        return Ok(());
    }
    for person in &people {
        match &person.relationship {
            Some(rel) => println!("  {} — {} ({})", person.name, rel, person.id),
            None => println!("  {} ({})", person.name, person.id),
        }
    }
    Ok(())
}
