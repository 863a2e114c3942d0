//! Behavioural tests for control requests served by `someipd`.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use control_channel::{ClientError, CommandId, ErrorCode, Request};

use super::support::{self, HealthEvent, TestWorld};

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("someipd is serving the control channel")]
fn given_someipd(world: &RefCell<TestWorld>) {
    world.borrow_mut().start_someipd();
}

#[given("a connected control client")]
fn given_client(world: &RefCell<TestWorld>) {
    world.borrow_mut().connect_client();
}

#[when("the client sends {count} foo requests")]
fn when_foo_requests(world: &RefCell<TestWorld>, count: usize) {
    let request = Request::for_id(CommandId::Foo).encode();
    for _ in 0..count {
        world.borrow_mut().send(&request);
    }
}

#[when("the client sends a bar request")]
fn when_bar_request(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .send(&Request::for_id(CommandId::Bar).encode());
}

#[when("the client sends command byte {value}")]
fn when_raw_command(world: &RefCell<TestWorld>, value: u8) {
    world.borrow_mut().send(&[value]);
}

#[when("the client sends an empty message")]
fn when_empty_message(world: &RefCell<TestWorld>) {
    world.borrow_mut().send(&[]);
}

#[when("someipd shuts down")]
fn when_someipd_stops(world: &RefCell<TestWorld>) {
    world.borrow_mut().stop_someipd();
}

#[then("every request succeeded with an empty reply")]
fn then_all_succeeded(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert!(!world.results.is_empty(), "no requests were sent");
    for result in &world.results {
        match result {
            Ok(reply) => assert!(reply.is_empty(), "unexpected reply {reply:?}"),
            Err(error) => panic!("request failed: {error}"),
        }
    }
}

#[then("someipd processed {foo} foo and {bar} bar commands")]
fn then_processed(world: &RefCell<TestWorld>, foo: u64, bar: u64) {
    let world = world.borrow();
    assert_eq!(world.processor.foo_count(), foo);
    assert_eq!(world.processor.bar_count(), bar);
}

#[then("request {index} was rejected as an invalid argument")]
fn then_rejected(world: &RefCell<TestWorld>, index: usize) {
    let world = world.borrow();
    let result = world
        .results
        .get(index.saturating_sub(1))
        .expect("no such request");
    assert!(
        matches!(
            result,
            Err(ClientError::Rejected {
                code: ErrorCode::InvalidArgument
            })
        ),
        "unexpected outcome {result:?}"
    );
}

#[then("request {index} succeeded")]
fn then_succeeded(world: &RefCell<TestWorld>, index: usize) {
    let world = world.borrow();
    let result = world
        .results
        .get(index.saturating_sub(1))
        .expect("no such request");
    assert!(result.is_ok(), "unexpected outcome {result:?}");
}

#[then("the reporter recorded the listener becoming ready")]
fn then_listener_ready(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let expected = HealthEvent::ListenerReady(world.loader.endpoint());
    assert!(world.reporter.events().contains(&expected));
}

#[then("someipd exited cleanly and removed its socket")]
fn then_clean_exit(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let result = world.someipd_result().expect("someipd still running");
    assert!(result.is_ok(), "someipd failed: {result:?}");
    assert!(!world.loader.path("control.sock").exists());
}

#[scenario(path = "tests/features/control_dispatch.feature")]
fn control_dispatch(world: RefCell<TestWorld>) {
    let _ = world;
}
