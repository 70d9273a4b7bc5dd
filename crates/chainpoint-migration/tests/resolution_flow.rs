//! End-to-end conversion against HTTP-mocked bitcoind and Insight mirrors.

use chainpoint_migration::{
    calculate_merkle_root, AnchoredBlock, BitcoindConfig, ChainpointReceipt, ConversionError,
    ConverterApi, ConverterConfig, ConverterService, QuorumConfig, ResolutionMode,
};
use serde_json::{json, Value};
use shared_ots::Attestation;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const HEIGHT: u64 = 447_669;

fn target_hash() -> String {
    "ab12".repeat(16)
}

fn sibling() -> String {
    "cd34".repeat(16)
}

fn receipt_json(txid: &str) -> String {
    let proof = vec![chainpoint_migration::ProofItem::right(sibling())];
    let root = calculate_merkle_root(&target_hash(), &proof).unwrap();
    json!({
        "@context": "https://w3id.org/chainpoint/v2",
        "type": "ChainpointSHA256v2",
        "targetHash": target_hash(),
        "merkleRoot": root,
        "proof": [{"right": sibling()}],
        "anchors": [{"type": "BTCOpReturn", "sourceId": txid}]
    })
    .to_string()
}

fn anchored_block() -> AnchoredBlock {
    let proof = vec![chainpoint_migration::ProofItem::right(sibling())];
    let root = calculate_merkle_root(&target_hash(), &proof).unwrap();
    AnchoredBlock::new(&hex::decode(root).unwrap(), HEIGHT, 6, 5)
}

/// bitcoind stand-in dispatching on the JSON-RPC method.
struct RpcNode {
    anchored: AnchoredBlock,
}

impl Respond for RpcNode {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match request.body_json() {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let params = &body["params"];
        let result = match body["method"].as_str() {
            Some("getrawtransaction") if params[1] == json!(true) => json!({
                "txid": self.anchored.txid,
                "blockhash": self.anchored.block_hash,
                "confirmations": 12
            }),
            Some("getrawtransaction") => json!(self.anchored.raw_tx_hex()),
            Some("getblock") => json!({
                "hash": self.anchored.block_hash,
                "height": self.anchored.block.height,
                "merkleroot": self.anchored.block.merkleroot,
                "tx": self.anchored.block.tx,
            }),
            _ => {
                return ResponseTemplate::new(500).set_body_json(json!({
                    "result": null,
                    "error": {"code": -32601, "message": "Method not found"},
                    "id": body["id"]
                }))
            }
        };
        ResponseTemplate::new(200).set_body_json(json!({"result": result, "error": null, "id": body["id"]}))
    }
}

async fn start_node(anchored: &AnchoredBlock) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(RpcNode {
            anchored: anchored.clone(),
        })
        .mount(&server)
        .await;
    server
}

async fn start_mirror(anchored: &AnchoredBlock, merkleroot: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/rawtx/{}", anchored.txid)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rawtx": anchored.raw_tx_hex()})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/tx/{}", anchored.txid)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"blockhash": anchored.block_hash})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/block/{}", anchored.block_hash)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "height": anchored.block.height,
            "merkleroot": merkleroot,
            "tx": anchored.block.tx,
        })))
        .mount(&server)
        .await;
    server
}

async fn silent_mirror() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    server
}

fn node_config(server: &MockServer) -> BitcoindConfig {
    let address = server.address();
    BitcoindConfig {
        host: address.ip().to_string(),
        port: address.port(),
        timeout_secs: 2,
        ..BitcoindConfig::new("rpcuser", "rpcpassword")
    }
}

fn quorum_config(servers: &[&MockServer]) -> QuorumConfig {
    QuorumConfig {
        mirrors: servers.iter().map(|s| s.uri()).collect(),
        timeout_secs: 2,
    }
}

fn assert_single_height_attestation(resolved: &chainpoint_migration::ResolvedTimestamp) {
    assert_eq!(resolved.resolved, 1);
    assert_eq!(resolved.attestations(), vec![&Attestation::bitcoin(HEIGHT)]);
}

#[tokio::test]
async fn test_trusted_node_resolution() {
    let anchored = anchored_block();
    let node = start_node(&anchored).await;
    let mirror = silent_mirror().await;

    let config = ConverterConfig {
        mode: ResolutionMode::Enabled,
        bitcoind: Some(node_config(&node)),
        quorum: quorum_config(&[&mirror]),
    };
    let service = ConverterService::from_config(&config).unwrap();

    let receipt = ChainpointReceipt::from_json(&receipt_json(&anchored.txid)).unwrap();
    let resolved = service.convert(&receipt).await.unwrap();
    assert_single_height_attestation(&resolved);
}

#[tokio::test]
async fn test_quorum_resolution_with_lying_mirror() {
    let anchored = anchored_block();
    let honest_a = start_mirror(&anchored, &anchored.block.merkleroot).await;
    let liar = start_mirror(&anchored, &"00".repeat(32)).await;
    let honest_b = start_mirror(&anchored, &anchored.block.merkleroot).await;

    let config = ConverterConfig {
        mode: ResolutionMode::Disabled,
        bitcoind: None,
        quorum: quorum_config(&[&honest_a, &liar, &honest_b]),
    };
    let service = ConverterService::from_config(&config).unwrap();

    let receipt = ChainpointReceipt::from_json(&receipt_json(&anchored.txid)).unwrap();
    let resolved = service.convert(&receipt).await.unwrap();
    assert_single_height_attestation(&resolved);

    let rendered = resolved.str_tree();
    assert!(rendered.starts_with(&format!("append {}", sibling())));
    assert!(rendered.contains("verify BitcoinBlockHeaderAttestation(447669)"));
}

#[tokio::test]
async fn test_node_failure_falls_back_to_quorum() {
    let anchored = anchored_block();
    let broken_node = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken_node)
        .await;
    let mirror_a = start_mirror(&anchored, &anchored.block.merkleroot).await;
    let mirror_b = start_mirror(&anchored, &anchored.block.merkleroot).await;

    let config = ConverterConfig {
        mode: ResolutionMode::Enabled,
        bitcoind: Some(node_config(&broken_node)),
        quorum: quorum_config(&[&mirror_a, &mirror_b]),
    };
    let service = ConverterService::from_config(&config).unwrap();

    let receipt = ChainpointReceipt::from_json(&receipt_json(&anchored.txid)).unwrap();
    let resolved = service.convert(&receipt).await.unwrap();
    assert_single_height_attestation(&resolved);
}

#[tokio::test]
async fn test_strict_mode_never_queries_mirrors() {
    let anchored = anchored_block();
    let broken_node = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken_node)
        .await;
    let mirror = silent_mirror().await;

    let config = ConverterConfig {
        mode: ResolutionMode::Strict,
        bitcoind: Some(node_config(&broken_node)),
        quorum: quorum_config(&[&mirror]),
    };
    let service = ConverterService::from_config(&config).unwrap();

    let receipt = ChainpointReceipt::from_json(&receipt_json(&anchored.txid)).unwrap();
    assert!(matches!(
        service.convert(&receipt).await,
        Err(ConversionError::RpcError(_))
    ));
}

#[tokio::test]
async fn test_mirrors_without_agreement() {
    let anchored = anchored_block();
    let honest = start_mirror(&anchored, &anchored.block.merkleroot).await;
    let liar = start_mirror(&anchored, &"00".repeat(32)).await;

    let config = ConverterConfig {
        mode: ResolutionMode::Disabled,
        bitcoind: None,
        quorum: quorum_config(&[&honest, &liar]),
    };
    let service = ConverterService::from_config(&config).unwrap();

    let receipt = ChainpointReceipt::from_json(&receipt_json(&anchored.txid)).unwrap();
    assert!(matches!(
        service.convert(&receipt).await,
        Err(ConversionError::QuorumNotReached { .. })
    ));
}

#[test]
fn test_unsupported_receipt_rejected() {
    let json = receipt_json("ef56").replace("ChainpointSHA256v2", "ChainpointSHA512v2");
    let receipt = ChainpointReceipt::from_json(&json).unwrap();
    assert!(chainpoint_migration::check_valid_header(&receipt).is_err());
}
