use super::BrokerClient;
use super::topic::topic_matches;

#[test]
fn test_topic_matches_exact() {
    assert!(topic_matches(
        "/topic/goss.gridappsd.simulation.log.sim-42",
        "/topic/goss.gridappsd.simulation.log.sim-42"
    ));
    assert!(!topic_matches(
        "/topic/goss.gridappsd.simulation.log.sim-42",
        "/topic/goss.gridappsd.simulation.log.sim-43"
    ));
}

#[test]
fn test_topic_matches_trailing_wildcard() {
    let pattern = "/topic/goss.gridappsd.simulation.output.>";
    assert!(topic_matches(
        pattern,
        "/topic/goss.gridappsd.simulation.output.sim-1"
    ));
    assert!(topic_matches(
        pattern,
        "/topic/goss.gridappsd.simulation.output.sim-1.voltages"
    ));
    // `>` requires at least one remaining segment
    assert!(!topic_matches(pattern, "/topic/goss.gridappsd.simulation.output"));
}

#[test]
fn test_topic_matches_single_segment_wildcard() {
    let pattern = "/topic/goss.gridappsd.simulation.*.sim-1";
    assert!(topic_matches(pattern, "/topic/goss.gridappsd.simulation.log.sim-1"));
    assert!(!topic_matches(pattern, "/topic/goss.gridappsd.simulation.log.extra.sim-1"));
}

#[test]
fn test_publish_is_observable_from_the_stub() {
    let (client, stub) = BrokerClient::in_memory();
    assert!(client.is_active());

    client.publish("/queue/example", "hello").unwrap();

    let published = stub.try_next_published().unwrap();
    assert_eq!(published.topic, "/queue/example");
    assert_eq!(published.payload, "hello");
}

#[test]
fn test_subscription_receives_matching_deliveries_in_order() {
    let (client, stub) = BrokerClient::in_memory();
    let (_subscription, mut messages) = client.subscribe("/topic/example").unwrap();

    stub.deliver("/topic/example", "first");
    stub.deliver("/topic/other", "not for us");
    stub.deliver("/topic/example", "second");

    assert_eq!(messages.try_recv().unwrap().payload, "first");
    assert_eq!(messages.try_recv().unwrap().payload, "second");
    assert!(messages.try_recv().is_err());
}

#[test]
fn test_two_subscribers_each_get_a_copy() {
    let (client, stub) = BrokerClient::in_memory();
    let (_sub_a, mut messages_a) = client.subscribe("/topic/example").unwrap();
    let (_sub_b, mut messages_b) = client.subscribe("/topic/example").unwrap();

    stub.deliver("/topic/example", "shared");

    assert_eq!(messages_a.try_recv().unwrap().payload, "shared");
    assert_eq!(messages_b.try_recv().unwrap().payload, "shared");
}

#[test]
fn test_cancel_completes_the_receiver() {
    let (client, stub) = BrokerClient::in_memory();
    let (subscription, mut messages) = client.subscribe("/topic/example").unwrap();

    subscription.cancel();
    stub.deliver("/topic/example", "after cancel");

    // sender side dropped, channel completed
    assert!(messages.try_recv().is_err());
    assert!(messages.blocking_recv().is_none());
}

#[test]
fn test_operations_fail_once_the_connection_is_lost() {
    let (client, stub) = BrokerClient::in_memory();
    let (_subscription, mut messages) = client.subscribe("/topic/example").unwrap();

    stub.close();

    assert!(!client.is_active());
    assert!(client.publish("/queue/example", "too late").is_err());
    assert!(client.subscribe("/topic/late").is_err());
    // existing subscriptions complete rather than error
    assert!(messages.blocking_recv().is_none());
}
