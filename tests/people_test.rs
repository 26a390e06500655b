mod helpers;

use helpers::*;
use keepsake::journal::types::NewMemory;
use keepsake::Error;

#[tokio::test]
async fn add_and_list_people() {
    let (service, _, _) = test_service();
    service.add_person("u1", "Zoe", None).unwrap();
    service
        .add_person("u1", "Alex", Some("brother".into()))
        .unwrap();

    let people = service.list_people("u1").unwrap();
    let names: Vec<&str> = people.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Alex", "Zoe"]);
    assert_eq!(people[0].relationship.as_deref(), Some("brother"));
}

#[tokio::test]
async fn duplicate_names_rejected_case_insensitively() {
    let (service, _, _) = test_service();
    service.add_person("u1", "Alex", None).unwrap();

    let err = service.add_person("u1", "ALEX", None).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Another user may use the same name
    service.add_person("u2", "alex", None).unwrap();
}

#[tokio::test]
async fn memory_creation_reuses_existing_people() {
    let (service, _, _) = test_service();
    let alex = service.add_person("u1", "Alex", None).unwrap();

    let memory = service
        .create_memory(
            "u1",
            NewMemory {
                content: "lunch with alex".into(),
                people: vec!["alex".into()], // different casing
                ..NewMemory::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(memory.people, vec![alex.id]);
    assert_eq!(service.list_people("u1").unwrap().len(), 1);
}

#[tokio::test]
async fn delete_blocked_while_memories_reference_person() {
    let (service, _, _) = test_service();

    let memory = service
        .create_memory(
            "u1",
            NewMemory {
                content: "hike with Sam".into(),
                people: vec!["Sam".into()],
                ..NewMemory::default()
            },
        )
        .await
        .unwrap();

    let sam = service.list_people("u1").unwrap().remove(0);
    assert!(matches!(
        service.delete_person("u1", &sam.id),
        Err(Error::Validation(_))
    ));

    service.delete_memory("u1", &memory.id).unwrap();
    service.delete_person("u1", &sam.id).unwrap();
    assert!(service.list_people("u1").unwrap().is_empty());
}

#[tokio::test]
async fn empty_person_name_is_rejected() {
    let (service, _, _) = test_service();
    assert!(matches!(
        service.add_person("u1", "  ", None),
        Err(Error::Validation(_))
    ));
}
