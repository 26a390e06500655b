//! Person (contact) store operations.
//!
//! Names are unique per user, case-insensitively, enforced by a NOCASE
//! unique index. Deleting a person that memories still reference is
//! rejected so nudge generation never resolves a dangling id.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::journal::{records, types::Person};

fn row_to_person(row: &Row<'_>) -> rusqlite::Result<Person> {
    let tags: String = row.get("tags")?;
    Ok(Person {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        relationship: row.get("relationship")?,
        avatar_ref: row.get("avatar_ref")?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        created_at: row.get("created_at")?,
    })
}

const PERSON_COLUMNS: &str = "id, user_id, name, relationship, avatar_ref, tags, created_at";

/// Insert a person. A duplicate name (any casing) for the same user maps
/// to [`Error::Validation`].
pub fn insert(conn: &Connection, person: &Person) -> Result<()> {
    let result = conn.execute(
        "INSERT INTO people (id, user_id, name, relationship, avatar_ref, tags, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            person.id,
            person.user_id,
            person.name,
            person.relationship,
            person.avatar_ref,
            serde_json::to_string(&person.tags).unwrap_or_else(|_| "[]".into()),
            person.created_at,
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(Error::Validation(format!(
                "a person named '{}' already exists",
                person.name
            )))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get(conn: &Connection, id: &str, user_id: &str) -> Result<Person> {
    let sql = format!("SELECT {PERSON_COLUMNS} FROM people WHERE id = ?1 AND user_id = ?2");
    conn.query_row(&sql, params![id, user_id], row_to_person)
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("person not found: {id}")))
}

/// Case-insensitive lookup by display name.
pub fn find_by_name(conn: &Connection, user_id: &str, name: &str) -> Result<Option<Person>> {
    let sql = format!(
        "SELECT {PERSON_COLUMNS} FROM people \
         WHERE user_id = ?1 AND name = ?2 COLLATE NOCASE"
    );
    Ok(conn
        .query_row(&sql, params![user_id, name], row_to_person)
        .optional()?)
}

/// All of a user's people, sorted by name.
pub fn list(conn: &Connection, user_id: &str) -> Result<Vec<Person>> {
    let sql = format!(
        "SELECT {PERSON_COLUMNS} FROM people WHERE user_id = ?1 ORDER BY name COLLATE NOCASE"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![user_id], row_to_person)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Update mutable fields of a person. Renaming into an existing name is
/// rejected the same way as on insert.
pub fn update(conn: &Connection, person: &Person) -> Result<()> {
    let result = conn.execute(
        "UPDATE people SET name = ?1, relationship = ?2, avatar_ref = ?3, tags = ?4 \
         WHERE id = ?5 AND user_id = ?6",
        params![
            person.name,
            person.relationship,
            person.avatar_ref,
            serde_json::to_string(&person.tags).unwrap_or_else(|_| "[]".into()),
            person.id,
            person.user_id,
        ],
    );

    match result {
        Ok(0) => Err(Error::NotFound(format!("person not found: {}", person.id))),
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(Error::Validation(format!(
                "a person named '{}' already exists",
                person.name
            )))
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a person. Fails with [`Error::Validation`] while any memory of
/// this user still references the id.
pub fn delete(conn: &Connection, id: &str, user_id: &str) -> Result<()> {
    if records::references_person(conn, user_id, id)? {
        return Err(Error::Validation(format!(
            "person {id} is still referenced by existing memories"
        )));
    }
    let rows = conn.execute(
        "DELETE FROM people WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if rows == 0 {
        return Err(Error::NotFound(format!("person not found: {id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::journal::types::{EmotionAnalysis, Memory, Valence};

    fn test_db() -> Connection {
        db::open_memory_database(8).unwrap()
    }

    fn sample(id: &str, user: &str, name: &str) -> Person {
        Person {
            id: id.to_string(),
            user_id: user.to_string(),
            name: name.to_string(),
            relationship: Some("friend".into()),
            avatar_ref: None,
            tags: vec!["college".into()],
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn insert_get_round_trip() {
        let conn = test_db();
        insert(&conn, &sample("p1", "u1", "Alex")).unwrap();

        let fetched = get(&conn, "p1", "u1").unwrap();
        assert_eq!(fetched.name, "Alex");
        assert_eq!(fetched.relationship.as_deref(), Some("friend"));
        assert_eq!(fetched.tags, vec!["college"]);
    }

    #[test]
    fn duplicate_name_any_case_is_validation_error() {
        let conn = test_db();
        insert(&conn, &sample("p1", "u1", "Alex")).unwrap();

        let err = insert(&conn, &sample("p2", "u1", "ALEX")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Different user may reuse the name
        insert(&conn, &sample("p3", "u2", "alex")).unwrap();
    }

    #[test]
    fn find_by_name_is_case_insensitive() {
        let conn = test_db();
        insert(&conn, &sample("p1", "u1", "Alex")).unwrap();

        assert!(find_by_name(&conn, "u1", "aLeX").unwrap().is_some());
        assert!(find_by_name(&conn, "u1", "Sam").unwrap().is_none());
        assert!(find_by_name(&conn, "u2", "Alex").unwrap().is_none());
    }

    #[test]
    fn list_sorts_by_name() {
        let conn = test_db();
        insert(&conn, &sample("p1", "u1", "zoe")).unwrap();
        insert(&conn, &sample("p2", "u1", "Alex")).unwrap();

        let names: Vec<String> = list(&conn, "u1").unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Alex", "zoe"]);
    }

    #[test]
    fn rename_into_existing_name_is_rejected() {
        let conn = test_db();
        insert(&conn, &sample("p1", "u1", "Alex")).unwrap();
        insert(&conn, &sample("p2", "u1", "Sam")).unwrap();

        let mut sam = get(&conn, "p2", "u1").unwrap();
        sam.name = "alex".into();
        assert!(matches!(update(&conn, &sam), Err(Error::Validation(_))));

        sam.name = "Samuel".into();
        update(&conn, &sam).unwrap();
        assert_eq!(get(&conn, "p2", "u1").unwrap().name, "Samuel");
    }

    #[test]
    fn delete_blocked_while_referenced() {
        let conn = test_db();
        insert(&conn, &sample("p1", "u1", "Alex")).unwrap();

        let now = chrono::Utc::now().to_rfc3339();
        let memory = Memory {
            id: "m1".into(),
            user_id: "u1".into(),
            content: "Lunch with Alex".into(),
            title: None,
            summary: "Lunch".into(),
            emotion: EmotionAnalysis {
                primary: "joy".into(),
                secondary: vec![],
                intensity: 5,
                valence: Valence::Positive,
            },
            mood: 7,
            tags: vec![],
            user_tags: vec![],
            people: vec!["p1".into()],
            location: None,
            weather: None,
            is_private: false,
            audio_ref: None,
            image_ref: None,
            embedding: vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            created_at: now.clone(),
            updated_at: now,
        };
        records::insert(&conn, &memory).unwrap();

        assert!(matches!(delete(&conn, "p1", "u1"), Err(Error::Validation(_))));

        records::delete(&conn, "m1", "u1").unwrap();
        delete(&conn, "p1", "u1").unwrap();
        assert!(matches!(get(&conn, "p1", "u1"), Err(Error::NotFound(_))));
    }

    #[test]
    fn delete_missing_person_is_not_found() {
        let conn = test_db();
        assert!(matches!(delete(&conn, "ghost", "u1"), Err(Error::NotFound(_))));
    }
}
