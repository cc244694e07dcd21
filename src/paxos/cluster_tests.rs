//! Multi-replica scenarios over an in-process network. Replicas talk to each other through the
//! same `PaxosPeer` seam the gRPC client implements, but calls are plain function calls that fail
//! with `Unreachable` while the target is marked down.

use crate::paxos::acceptor::GrantedMessage;
use crate::paxos::messenger::{ClusterMessenger, PaxosMessenger, PermissionOutcome};
use crate::paxos::node::ReplicaNode;
use crate::paxos::peers::{ConnectError, MemberInfo, PaxosPeer, PeerCallError, PeerConnector, ReplicaId};
use crate::paxos::proposer::Proposer;
use crate::paxos::suggestion_id::{StateId, SuggestionId};
use crate::paxos::value::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

const RPC_TIMEOUT: Duration = Duration::from_millis(100);
const SANITY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct InProcessNetwork {
    nodes: Mutex<HashMap<ReplicaId, (Arc<ReplicaNode>, Arc<AtomicBool>)>>,
    /// Every consensus report delivered over a link, in delivery order.
    consensus_reports: Mutex<Vec<(StateId, Value)>>,
}

impl InProcessNetwork {
    fn set_up(&self, replica_id: &str, up: bool) {
        let nodes = self.nodes.lock().unwrap();
        let (_, is_up) = nodes.get(&ReplicaId::new(replica_id)).expect("unknown replica");
        is_up.store(up, Ordering::SeqCst);
    }

    fn consensus_reports(&self) -> Vec<(StateId, Value)> {
        self.consensus_reports.lock().unwrap().clone()
    }
}

struct InProcessConnector {
    network: Weak<InProcessNetwork>,
}

#[async_trait::async_trait]
impl PeerConnector for InProcessConnector {
    async fn connect(&self, member: &MemberInfo) -> Result<Arc<dyn PaxosPeer>, ConnectError> {
        let network = self
            .network
            .upgrade()
            .ok_or_else(|| ConnectError::ConnectFailure("network is gone".into()))?;
        let nodes = network.nodes.lock().unwrap();
        let (node, is_up) = nodes
            .get(&member.replica_id)
            .ok_or_else(|| ConnectError::InvalidAddress(member.host.clone()))?;

        if !is_up.load(Ordering::SeqCst) {
            return Err(ConnectError::ConnectFailure(format!("{:?} is down", member.replica_id)));
        }

        Ok(Arc::new(InProcessPeer {
            node: Arc::downgrade(node),
            is_up: is_up.clone(),
            network: self.network.clone(),
        }))
    }
}

struct InProcessPeer {
    node: Weak<ReplicaNode>,
    is_up: Arc<AtomicBool>,
    network: Weak<InProcessNetwork>,
}

impl InProcessPeer {
    fn reachable(&self) -> Result<Arc<ReplicaNode>, PeerCallError> {
        if !self.is_up.load(Ordering::SeqCst) {
            return Err(PeerCallError::Unreachable);
        }
        self.node.upgrade().ok_or(PeerCallError::Unreachable)
    }
}

#[async_trait::async_trait]
impl PaxosPeer for InProcessPeer {
    async fn register_this_id(&self, id: ReplicaId) -> Result<bool, PeerCallError> {
        let node = self.reachable()?;
        Ok(node.handle_register_this_id(id).await)
    }

    async fn request_permission(
        &self,
        suggestion_id: SuggestionId,
        state_id: StateId,
    ) -> Result<GrantedMessage, PeerCallError> {
        Ok(self.reachable()?.handle_request_permission(suggestion_id, state_id))
    }

    async fn suggest_value(
        &self,
        suggestion_id: SuggestionId,
        value: Value,
        state_id: StateId,
    ) -> Result<bool, PeerCallError> {
        Ok(self.reachable()?.handle_suggest_value(suggestion_id, value, state_id))
    }

    async fn report_consensus(&self, value: Value, state_id: StateId) -> Result<(), PeerCallError> {
        let node = self.reachable()?;
        if let Some(network) = self.network.upgrade() {
            network.consensus_reports.lock().unwrap().push((state_id, value.clone()));
        }
        node.handle_report_consensus(value, state_id);
        Ok(())
    }

    async fn get_state_id(&self) -> Result<StateId, PeerCallError> {
        Ok(self.reachable()?.state_id())
    }
}

struct TestCluster {
    network: Arc<InProcessNetwork>,
    nodes: HashMap<String, Arc<ReplicaNode>>,
    majority: usize,
}

impl TestCluster {
    /// Create every replica, bootstrap membership, and start each replica's proposer.
    async fn start(replica_ids: &[&str], majority: usize) -> Self {
        let cluster = Self::create(replica_ids, majority).await;
        for node in cluster.nodes.values() {
            cluster.spawn_proposer(node.clone());
        }
        cluster
    }

    /// Like `start()`, without any proposers running.
    async fn create(replica_ids: &[&str], majority: usize) -> Self {
        let logger = test_logger();
        let network = Arc::new(InProcessNetwork::default());
        let members: Vec<MemberInfo> = replica_ids
            .iter()
            .map(|id| MemberInfo {
                replica_id: ReplicaId::new(*id),
                host: format!("in-process-{}", id),
                port: 0,
            })
            .collect();

        let mut nodes = HashMap::new();
        for id in replica_ids {
            let node = Arc::new(ReplicaNode::new(
                logger.new(slog::o!("ReplicaId" => id.to_string())),
                ReplicaId::new(*id),
                members.clone(),
                Arc::new(InProcessConnector {
                    network: Arc::downgrade(&network),
                }),
            ));
            network
                .nodes
                .lock()
                .unwrap()
                .insert(ReplicaId::new(*id), (node.clone(), Arc::new(AtomicBool::new(true))));
            nodes.insert(id.to_string(), node);
        }

        for node in nodes.values() {
            node.membership().join_cluster().await.expect("join cluster");
        }

        TestCluster {
            network,
            nodes,
            majority,
        }
    }

    fn node(&self, replica_id: &str) -> Arc<ReplicaNode> {
        self.nodes.get(replica_id).expect("unknown replica").clone()
    }

    fn messenger(&self, replica_id: &str) -> ClusterMessenger {
        ClusterMessenger::new(test_logger(), self.node(replica_id), self.majority, RPC_TIMEOUT)
    }

    fn spawn_proposer(&self, node: Arc<ReplicaNode>) {
        let proposer = Proposer::new(
            test_logger(),
            node.my_replica_id().clone(),
            node.queue().clone(),
            ClusterMessenger::new(test_logger(), node.clone(), self.majority, RPC_TIMEOUT),
            Duration::from_millis(1),
            Duration::from_millis(5),
        );
        tokio::spawn(proposer.run());
    }

    async fn put(&self, replica_id: &str, key: &str, value: &str) {
        let receipt = self.node(replica_id).propose(Value::put(key.into(), value.into()));
        tokio::time::timeout(SANITY_TIMEOUT, receipt.executed())
            .await
            .expect("put should reach consensus")
            .expect("proposal dropped");
    }

    async fn delete(&self, replica_id: &str, key: &str) {
        let receipt = self.node(replica_id).propose(Value::delete(key.into()));
        tokio::time::timeout(SANITY_TIMEOUT, receipt.executed())
            .await
            .expect("delete should reach consensus")
            .expect("proposal dropped");
    }

    /// Consensus reports fan out concurrently, so other replicas may apply a value a moment after
    /// the proposer's client was released.
    async fn eventually_reads(&self, replica_id: &str, key: &str, expected: Option<&str>) {
        let node = self.node(replica_id);
        let expected = expected.map(str::to_string);
        let poll = async {
            while node.read(key) != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        if tokio::time::timeout(SANITY_TIMEOUT, poll).await.is_err() {
            panic!(
                "{} never read {:?} = {:?} (last read {:?})",
                replica_id,
                key,
                expected,
                node.read(key)
            );
        }
    }
}

fn test_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}

#[tokio::test]
async fn single_replica_put_get_delete() {
    let cluster = TestCluster::start(&["solo"], 1).await;

    cluster.put("solo", "x", "1").await;
    assert_eq!(cluster.node("solo").read("x"), Some("1".to_string()));

    cluster.delete("solo", "x").await;
    assert_eq!(cluster.node("solo").read("x"), None);
    assert_eq!(cluster.node("solo").state_id(), StateId::new(3));
}

#[tokio::test]
async fn put_survives_one_dead_replica() {
    let cluster = TestCluster::start(&["a", "b", "c"], 2).await;
    cluster.network.set_up("c", false);

    cluster.put("a", "x", "1").await;

    cluster.eventually_reads("a", "x", Some("1")).await;
    cluster.eventually_reads("b", "x", Some("1")).await;
    assert_eq!(cluster.node("c").read("x"), None);
}

#[tokio::test]
async fn no_progress_without_majority() {
    let cluster = TestCluster::start(&["a", "b", "c"], 2).await;
    cluster.network.set_up("b", false);
    cluster.network.set_up("c", false);

    let receipt = cluster.node("a").propose(Value::put("x".into(), "1".into()));

    // Blocks for as long as the majority is gone.
    let waited = tokio::time::timeout(Duration::from_millis(300), receipt.executed()).await;
    assert!(waited.is_err());
    assert_eq!(cluster.node("a").read("x"), None);
    assert!(cluster.network.consensus_reports().is_empty());
}

#[tokio::test]
async fn concurrent_puts_on_distinct_keys() {
    let cluster = TestCluster::start(&["a", "b"], 2).await;

    tokio::join!(cluster.put("a", "from-a", "1"), cluster.put("b", "from-b", "2"));

    for replica in &["a", "b"] {
        cluster.eventually_reads(replica, "from-a", Some("1")).await;
        cluster.eventually_reads(replica, "from-b", Some("2")).await;
    }
}

#[tokio::test]
async fn at_most_one_value_per_slot() {
    let replicas = ["a", "b", "c"];
    let cluster = TestCluster::start(&replicas, 2).await;

    let mut puts = Vec::new();
    for replica in &replicas {
        for i in 0..5 {
            let key = format!("{}-{}", replica, i);
            let receipt = cluster.node(replica).propose(Value::put(key, i.to_string()));
            puts.push(receipt);
        }
    }
    for receipt in puts {
        tokio::time::timeout(SANITY_TIMEOUT, receipt.executed())
            .await
            .expect("put should reach consensus")
            .expect("proposal dropped");
    }

    let mut decided: HashMap<StateId, Value> = HashMap::new();
    for (state_id, value) in cluster.network.consensus_reports() {
        match decided.get(&state_id) {
            Some(existing) => assert_eq!(*existing, value, "two values reported for {:?}", state_id),
            None => {
                decided.insert(state_id, value);
            }
        }
    }

    // A put can be decided again in a later slot if its proposer had not yet heard the first
    // decision. That's harmless; what matters is that every put was decided somewhere.
    let keys_decided: HashSet<&str> = decided.values().filter_map(|value| value.key()).collect();
    assert_eq!(keys_decided.len(), 15);

    for replica in &replicas {
        for writer in &replicas {
            for i in 0..5 {
                let key = format!("{}-{}", writer, i);
                let expected = i.to_string();
                cluster.eventually_reads(replica, &key, Some(expected.as_str())).await;
            }
        }
    }
}

#[tokio::test]
async fn identical_commands_are_interchangeable() {
    let cluster = TestCluster::start(&["a", "b"], 2).await;

    // Same content queued on both replicas. Either consensus releases either client.
    tokio::join!(cluster.put("a", "x", "same"), cluster.put("b", "x", "same"));

    cluster.eventually_reads("a", "x", Some("same")).await;
    cluster.eventually_reads("b", "x", Some("same")).await;
}

#[tokio::test]
async fn lagging_replica_catches_up_state_id_and_proposes() {
    let cluster = TestCluster::start(&["a", "b", "c"], 2).await;
    cluster.network.set_up("c", false);
    cluster.put("a", "x", "1").await;
    cluster.eventually_reads("b", "x", Some("1")).await;
    cluster.network.set_up("c", true);

    assert_eq!(cluster.node("c").state_id(), StateId::first_slot());
    assert_eq!(cluster.node("a").state_id(), StateId::new(2));

    // c's first attempt is for a slot the others already decided. It is told so, adopts their
    // state id, and its retry goes through.
    cluster.put("c", "y", "2").await;

    assert!(cluster.node("c").state_id() >= StateId::new(3));
    cluster.eventually_reads("a", "y", Some("2")).await;
    cluster.eventually_reads("b", "y", Some("2")).await;

    // c jumped over slot 1 without learning what was decided there.
    assert_eq!(cluster.node("c").read("x"), None);
}

#[tokio::test]
async fn missed_consensus_broadcast_leaves_replica_behind() {
    let cluster = TestCluster::start(&["a", "b", "c"], 2).await;
    cluster.network.set_up("c", false);
    cluster.put("a", "x", "1").await;
    cluster.network.set_up("c", true);

    // Nothing repairs c until some later round includes it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cluster.node("c").read("x"), None);
    assert_eq!(cluster.node("c").state_id(), StateId::first_slot());

    // A later round advances c's state id, but the missed value stays missed.
    cluster.put("a", "z", "3").await;
    cluster.eventually_reads("c", "z", Some("3")).await;
    assert_eq!(cluster.node("c").read("x"), None);
    assert_eq!(cluster.node("c").state_id(), StateId::new(3));
}

#[tokio::test]
async fn permission_tally_returns_highest_accepted_value() {
    let cluster = TestCluster::create(&["a", "b", "c"], 2).await;
    let slot = StateId::first_slot();
    let older = Value::put("k".into(), "older".into());
    let newer = Value::put("k".into(), "newer".into());
    assert!(cluster
        .node("a")
        .handle_suggest_value(SuggestionId::new(1, ReplicaId::new("a")), older, slot));
    assert!(cluster
        .node("b")
        .handle_suggest_value(SuggestionId::new(2, ReplicaId::new("b")), newer.clone(), slot));

    let outcome = cluster
        .messenger("c")
        .send_permission_messages(SuggestionId::new(3, ReplicaId::new("c")), slot)
        .await;

    assert_eq!(
        outcome,
        PermissionOutcome::Majority {
            highest_accepted_value: Some(newer)
        }
    );
}

#[tokio::test]
async fn permission_tally_reports_highest_promise_on_nack() {
    let cluster = TestCluster::create(&["a", "b", "c"], 2).await;
    let slot = StateId::first_slot();
    cluster
        .node("a")
        .handle_request_permission(SuggestionId::new(4, ReplicaId::new("a")), slot);
    cluster
        .node("b")
        .handle_request_permission(SuggestionId::new(9, ReplicaId::new("b")), slot);

    let outcome = cluster
        .messenger("c")
        .send_permission_messages(SuggestionId::new(2, ReplicaId::new("c")), slot)
        .await;

    assert_eq!(
        outcome,
        PermissionOutcome::NoMajority {
            highest_promised_round: Some(9)
        }
    );
    // Rejections don't touch anyone's promise.
    assert_eq!(
        cluster.node("b").acceptor().last_promised_id(),
        SuggestionId::new(9, ReplicaId::new("b"))
    );
}

#[tokio::test]
async fn permission_tally_adopts_state_id_on_state_nack() {
    let cluster = TestCluster::create(&["a", "b", "c"], 2).await;
    cluster.node("a").queue().advance_state_id(StateId::new(5));

    let outcome = cluster
        .messenger("c")
        .send_permission_messages(SuggestionId::new(1, ReplicaId::new("c")), StateId::first_slot())
        .await;

    assert_eq!(
        outcome,
        PermissionOutcome::StaleState {
            adopted_state_id: Some(StateId::new(5))
        }
    );
    assert_eq!(cluster.node("c").state_id(), StateId::new(5));
}

#[tokio::test]
async fn unreachable_replicas_are_excluded_from_tally() {
    let cluster = TestCluster::create(&["a", "b", "c"], 2).await;
    cluster.network.set_up("a", false);
    cluster.network.set_up("b", false);
    let messenger = cluster.messenger("c");
    let id = SuggestionId::new(1, ReplicaId::new("c"));

    let outcome = messenger
        .send_permission_messages(id.clone(), StateId::first_slot())
        .await;
    assert_eq!(
        outcome,
        PermissionOutcome::NoMajority {
            highest_promised_round: None
        }
    );
    assert!(
        !messenger
            .send_suggestion_messages(id, Value::no_op(), StateId::first_slot())
            .await
    );

    // c's own acceptor took the failed suggestion, so the next majority must carry it.
    cluster.network.set_up("b", true);
    let outcome = messenger
        .send_permission_messages(SuggestionId::new(2, ReplicaId::new("c")), StateId::first_slot())
        .await;
    assert_eq!(
        outcome,
        PermissionOutcome::Majority {
            highest_accepted_value: Some(Value::no_op())
        }
    );
}

#[tokio::test]
async fn registration_is_two_way_and_refuses_strangers() {
    let cluster = TestCluster::create(&["a", "b"], 2).await;
    for node in cluster.nodes.values() {
        assert_eq!(node.membership().replicas().len(), 2);
    }

    // A replica outside the static configuration is refused.
    assert!(
        !cluster
            .node("a")
            .handle_register_this_id(ReplicaId::new("stranger"))
            .await
    );
    assert_eq!(cluster.node("a").membership().replicas().len(), 2);
}
