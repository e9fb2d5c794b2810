//! VirtualDom smoke tests for the hooks layer.

mod common;

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use dioxus::prelude::*;
use dioxus_core::NoOpMutations;
use futures::FutureExt;
use tokio::time::sleep;

use common::*;
use dioxus_repo_pulse::prelude::*;

type Snapshot = ProgressiveDataState<f64, DirectCommits>;

#[derive(Props, Clone, PartialEq)]
struct ConsumerProps {
    source: StubSource,
    owner: Option<String>,
    recorder: Rc<RefCell<Vec<Snapshot>>>,
}

#[allow(non_snake_case)]
fn Consumer(props: ConsumerProps) -> Element {
    let state = use_progressive_repo_data(
        props.source.clone(),
        props.owner.clone(),
        Some("hello-world".to_string()),
        TimeRange::ThirtyDays,
        false,
    );
    let record = props.recorder.clone();
    use_effect(move || {
        record.borrow_mut().push(state.read().clone());
    });
    rsx!(div {})
}

fn block_on_test(fut: impl Future<Output = ()>) {
    tokio::runtime::Runtime::new()
        .expect("tokio runtime")
        .block_on(fut);
}

fn init_fast_runtime() {
    let config = PulseRuntimeConfig::new()
        .with_deferred_idle(Duration::from_millis(1))
        .with_loader_config(fast_config());
    init_with(config).expect("runtime initialization");
}

async fn pump(vdom: &mut VirtualDom, recorder: &Rc<RefCell<Vec<Snapshot>>>, rounds: u32) {
    let mut mutations = NoOpMutations;
    for _ in 0..rounds {
        while vdom.wait_for_work().now_or_never().is_some() {
            vdom.render_immediate(&mut mutations);
        }
        sleep(Duration::from_millis(5)).await;
        if recorder
            .borrow()
            .last()
            .is_some_and(|snapshot| snapshot.stage_progress.complete)
        {
            break;
        }
    }
}

#[test]
fn hook_reaches_complete_and_never_regresses() {
    block_on_test(async {
        init_fast_runtime();
        let source = StubSource::records(records_cycling(10, 4));
        let recorder = Rc::new(RefCell::new(Vec::new()));

        let mut vdom = VirtualDom::new_with_props(
            Consumer,
            ConsumerProps {
                source: source.clone(),
                owner: Some("octocat".to_string()),
                recorder: recorder.clone(),
            },
        );
        vdom.rebuild_in_place();
        pump(&mut vdom, &recorder, 100).await;

        let snapshots = recorder.borrow();
        let last = snapshots.last().expect("at least one snapshot");
        assert!(last.stage_progress.complete, "hook never reached complete");
        assert_eq!(last.stats.pull_requests.len(), 10);
        for pair in snapshots.windows(2) {
            assert!(
                pair[0].current_stage <= pair[1].current_stage,
                "stage regressed across rendered snapshots"
            );
        }
        // critical + full, once each
        assert_eq!(source.fetches(), 2);
    });
}

#[test]
fn hook_with_missing_owner_stays_initial() {
    block_on_test(async {
        init_fast_runtime();
        let source = StubSource::records(records_cycling(3, 1));
        let recorder = Rc::new(RefCell::new(Vec::new()));

        let mut vdom = VirtualDom::new_with_props(
            Consumer,
            ConsumerProps {
                source: source.clone(),
                owner: None,
                recorder: recorder.clone(),
            },
        );
        vdom.rebuild_in_place();
        pump(&mut vdom, &recorder, 20).await;

        assert_eq!(source.fetches(), 0);
        let snapshots = recorder.borrow();
        assert!(
            snapshots
                .iter()
                .all(|snapshot| snapshot.current_stage == LoadingStage::Initial)
        );
    });
}
