//! Live Neo4j harness for integration tests (feature `test-utils`).

use neo4rs::query;
use testcontainers::{
    core::{ContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use crate::GraphClient;

const IMAGE: (&str, &str) = ("neo4j", "5.25.1-community");
const BOLT_PORT: u16 = 7687;
const PASSWORD: &str = "graphbrain-test";

/// A throwaway Neo4j. The container stops when this is dropped, so keep it
/// alive for the whole test.
pub struct TestGraph {
    _container: ContainerAsync<GenericImage>,
    pub client: GraphClient,
}

impl TestGraph {
    /// Scalar `c` column of a single-row read query.
    pub async fn count(&self, cypher: &str) -> i64 {
        let mut rows = self
            .client
            .inner()
            .execute(query(cypher))
            .await
            .expect("count query runs");
        let row = rows
            .next()
            .await
            .expect("count row streams")
            .expect("count query returns one row");
        row.get::<i64>("c").expect("count column is an integer")
    }

    pub async fn node_count(&self) -> i64 {
        self.count("MATCH (n) RETURN count(n) AS c").await
    }
}

/// Start Neo4j community edition and connect to it.
pub async fn neo4j_container() -> TestGraph {
    let container = GenericImage::new(IMAGE.0, IMAGE.1)
        .with_exposed_port(ContainerPort::Tcp(BOLT_PORT))
        .with_wait_for(WaitFor::message_on_stdout("Started."))
        .with_env_var("NEO4J_AUTH", format!("neo4j/{PASSWORD}"))
        .start()
        .await
        .expect("Neo4j container starts");

    let port = container
        .get_host_port_ipv4(BOLT_PORT)
        .await
        .expect("Bolt port is mapped");
    let client = GraphClient::connect(&format!("bolt://127.0.0.1:{port}"), "neo4j", PASSWORD)
        .await
        .expect("Neo4j accepts connections");

    TestGraph {
        _container: container,
        client,
    }
}
