use pretty_assertions::assert_eq;
use spacecopy_core::ContentClient;
use spacecopy_core::identity::IdentityResolver;
use spacecopy_test_support::RecordingSleeper;
use spacecopy_test_support::migration_config;
use spacecopy_test_support::source_and_destination;
use wiremock::MockServer;

#[tokio::test]
async fn same_title_under_different_parents_is_not_a_match() {
    let (source, destination) = source_and_destination().await;
    let team_a = destination.add_page("Team A", "", None);
    let team_b = destination.add_page("Team B", "", None);
    let notes = destination.add_page("Notes", "", Some(&team_a));

    let config = migration_config(&source, &destination);
    let client = ContentClient::from_config(&config.destination, &config, None).unwrap();
    let resolver = IdentityResolver::new(&client);

    let under_a = resolver.find_existing("Notes", Some(&team_a)).await.unwrap();
    assert_eq!(under_a.map(|m| (m.id, m.version)), Some((notes, 1)));

    assert_eq!(resolver.find_existing("Notes", Some(&team_b)).await.unwrap(), None);
    assert_eq!(resolver.find_existing("Notes", None).await.unwrap(), None);
}

#[tokio::test]
async fn picks_the_candidate_under_the_requested_parent() {
    let (source, destination) = source_and_destination().await;
    let team_a = destination.add_page("Team A", "", None);
    let team_b = destination.add_page("Team B", "", None);
    destination.add_page("Notes", "", Some(&team_a));
    let notes_b = destination.add_page("Notes", "", Some(&team_b));
    let notes_root = destination.add_page("Notes", "", None);

    let config = migration_config(&source, &destination);
    let client = ContentClient::from_config(&config.destination, &config, None).unwrap();
    let resolver = IdentityResolver::new(&client);

    let found = resolver.find_existing("Notes", Some(&team_b)).await.unwrap().unwrap();
    assert_eq!(found.id, notes_b);
    assert_eq!(found.parent_id.as_deref(), Some(team_b.as_str()));

    let root = resolver.find_existing("Notes", None).await.unwrap().unwrap();
    assert_eq!(root.id, notes_root);
}

#[tokio::test]
async fn rejected_lookup_reports_no_match() {
    let (source, destination) = source_and_destination().await;
    destination.add_page("Notes", "", None);
    destination.fail_title_lookups();

    let config = migration_config(&source, &destination);
    let client = ContentClient::from_config(&config.destination, &config, None).unwrap();

    let found = IdentityResolver::new(&client).find_existing("Notes", None).await.unwrap();
    assert_eq!(found, None);
}

#[tokio::test]
async fn connection_fault_during_lookup_propagates() {
    let (source, destination) = source_and_destination().await;
    let dead = MockServer::start().await;
    let dead_uri = dead.uri();
    drop(dead);

    let mut config = migration_config(&source, &destination);
    config.destination.base_url = dead_uri;
    let client =
        ContentClient::from_config(&config.destination, &config, Some(RecordingSleeper::new())).unwrap();

    let err = IdentityResolver::new(&client)
        .find_existing("Notes", None)
        .await
        .unwrap_err();
    assert!(err.is_fatal_transport());
}
