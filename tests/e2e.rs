//! End-to-end scenarios over real sockets on 127.0.0.1

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use price_relay::client::{PriceFeed, RelayConfig, UpstreamRelayClient};
use price_relay::registry::{PriceTick, RegistryConfig};
use price_relay::server::{ClientCount, IngestTier, PortBinder, PublicTier, ServerConfig};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const WAIT: Duration = Duration::from_secs(5);

struct Running {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<price_relay::Result<()>>,
}

fn test_config() -> ServerConfig {
    // Long update interval so tests control every tick
    ServerConfig::default()
        .host(LOCALHOST)
        .update_interval(Duration::from_secs(3600))
        .push_interval(Duration::from_millis(20))
}

async fn start_ingest(config: ServerConfig) -> (IngestTier, Running) {
    let listener = PortBinder::from_config(&config).bind_from(0).await.unwrap();
    let addr = listener.local_addr();
    let tier = IngestTier::new(config);
    let (tx, rx) = oneshot::channel();

    let task = tokio::spawn(tier.clone().run_until(listener, async move {
        let _ = rx.await;
    }));

    (
        tier,
        Running {
            addr,
            shutdown: tx,
            task,
        },
    )
}

async fn start_relay(upstream: SocketAddr) -> (PublicTier, Running, JoinHandle<()>) {
    let relay_config = RelayConfig::new(format!("http://{upstream}/price-updates"))
        .backoff(Duration::from_millis(10), Duration::from_millis(100));
    let (client, cache) = UpstreamRelayClient::new(relay_config).unwrap();
    let tier = PublicTier::new(test_config(), cache, client.stats());
    let upstream_task = client.spawn();

    let listener = PortBinder::new(LOCALHOST).bind_from(0).await.unwrap();
    let addr = listener.local_addr();
    let (tx, rx) = oneshot::channel();
    let task = tokio::spawn(tier.clone().run_until(listener, async move {
        let _ = rx.await;
    }));

    (
        tier,
        Running {
            addr,
            shutdown: tx,
            task,
        },
        upstream_task,
    )
}

async fn client_count(http: &reqwest::Client, addr: SocketAddr) -> usize {
    http.get(format!("http://{addr}/client-count"))
        .send()
        .await
        .unwrap()
        .json::<ClientCount>()
        .await
        .unwrap()
        .connected_clients
}

/// Read from `feed` until a tick with `price` arrives
async fn wait_for_price(feed: &mut PriceFeed, price: &str) {
    tokio::time::timeout(WAIT, async {
        loop {
            let tick = feed.next_tick().await.unwrap().expect("stream ended");
            if tick.price() == price {
                return;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("price {price} never arrived"));
}

#[tokio::test]
async fn scenario_a_ingest_fan_out_and_client_count() {
    let (tier, server) = start_ingest(test_config()).await;
    let http = reqwest::Client::new();
    let url = format!("http://{}/price-updates", server.addr);

    let mut feeds = Vec::new();
    for _ in 0..3 {
        let mut feed = PriceFeed::connect(&http, &url).await.unwrap();
        // Current value is sent on connect
        let initial = feed.next_tick().await.unwrap().unwrap();
        assert!(initial.price().parse::<f64>().is_ok());
        feeds.push(feed);
    }

    assert_eq!(client_count(&http, server.addr).await, 3);

    assert_eq!(tier.publish(PriceTick::new("123.45")), 3);
    for feed in &mut feeds {
        wait_for_price(feed, "123.45").await;
    }

    drop(feeds.pop());

    let deadline = Instant::now() + WAIT;
    loop {
        // Pushes surface the closed transport if the close went unnoticed
        tier.publish(PriceTick::new("123.46"));
        if client_count(&http, server.addr).await == 2 {
            break;
        }
        assert!(Instant::now() < deadline, "disconnect was never observed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn scenario_b_relay_republishes_upstream_value() {
    let (ingest, ingest_server) = start_ingest(test_config()).await;
    let (relay, relay_server, upstream_task) = start_relay(ingest_server.addr).await;
    let http = reqwest::Client::new();

    let url = format!("http://{}/public-price-updates", relay_server.addr);
    let mut feed = PriceFeed::connect(&http, &url).await.unwrap();

    // Keep publishing until the relay has linked up and relayed it
    let publisher = {
        let ingest = ingest.clone();
        tokio::spawn(async move {
            loop {
                ingest.publish(PriceTick::new("50.00"));
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
    };

    wait_for_price(&mut feed, "50.00").await;
    publisher.abort();

    assert_eq!(relay.cache().latest().unwrap().price(), "50.00");
    // The relay is the only subscriber of the ingest tier
    assert_eq!(client_count(&http, ingest_server.addr).await, 1);
    assert_eq!(client_count(&http, relay_server.addr).await, 1);

    let stats: serde_json::Value = http
        .get(format!("http://{}/stats", relay_server.addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["relay"]["connected"], true);
    assert!(stats["relay"]["ticksReceived"].as_u64().unwrap() >= 1);

    upstream_task.abort();
    let _ = relay_server.shutdown.send(());
    let _ = ingest_server.shutdown.send(());
}

#[tokio::test]
async fn relay_keeps_cached_value_after_upstream_loss() {
    let (ingest, ingest_server) = start_ingest(test_config()).await;
    let (relay, relay_server, upstream_task) = start_relay(ingest_server.addr).await;
    let http = reqwest::Client::new();

    let mut cache = relay.cache().clone();
    ingest.publish(PriceTick::new("75.25"));
    tokio::time::timeout(WAIT, async {
        while cache.latest().map(|t| t.price() != "75.25").unwrap_or(true) {
            ingest.publish(PriceTick::new("75.25"));
            cache.changed().await;
        }
    })
    .await
    .unwrap();

    // Stop the ingest tier; the relay keeps serving the last value
    let _ = ingest_server.shutdown.send(());
    tokio::time::timeout(WAIT, ingest_server.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let url = format!("http://{}/public-price-updates", relay_server.addr);
    let mut feed = PriceFeed::connect(&http, &url).await.unwrap();
    wait_for_price(&mut feed, "75.25").await;
    assert!(!upstream_task.is_finished());

    upstream_task.abort();
    let _ = relay_server.shutdown.send(());
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let (_tier, server) = start_ingest(test_config()).await;
    let http = reqwest::Client::new();

    let response = http
        .get(format!("http://{}/client-count", server.addr))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn shutdown_ends_open_streams() {
    let (_tier, server) = start_ingest(test_config()).await;
    let http = reqwest::Client::new();
    let url = format!("http://{}/price-updates", server.addr);

    let mut feed = PriceFeed::connect(&http, &url).await.unwrap();
    feed.next_tick().await.unwrap().unwrap();

    server.shutdown.send(()).unwrap();

    let end = tokio::time::timeout(WAIT, async {
        loop {
            match feed.next_tick().await {
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break,
            }
        }
    })
    .await;
    assert!(end.is_ok(), "stream stayed open after shutdown");

    tokio::time::timeout(WAIT, server.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn network_latency_delays_each_push() {
    let config = test_config().network_latency(Duration::from_millis(100));
    let (_tier, server) = start_ingest(config).await;
    let http = reqwest::Client::new();
    let url = format!("http://{}/price-updates", server.addr);

    let started = Instant::now();
    let mut feed = PriceFeed::connect(&http, &url).await.unwrap();
    feed.next_tick().await.unwrap().unwrap();

    assert!(started.elapsed() >= Duration::from_millis(100));

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn latency_longer_than_update_interval_keeps_client_connected() {
    let config = test_config()
        .update_interval(Duration::from_millis(10))
        .network_latency(Duration::from_millis(50))
        .registry(RegistryConfig::default().subscriber_buffer(4));
    let (tier, server) = start_ingest(config).await;
    let http = reqwest::Client::new();
    let url = format!("http://{}/price-updates", server.addr);

    let mut feed = PriceFeed::connect(&http, &url).await.unwrap();
    let started = Instant::now();
    let mut received = 0;
    while started.elapsed() < Duration::from_millis(1500) {
        let tick = tokio::time::timeout(WAIT, feed.next_tick())
            .await
            .expect("no tick within timeout")
            .unwrap();
        assert!(tick.is_some(), "stream ended while the client was reading");
        received += 1;
    }

    assert!(received >= 10);
    assert_eq!(client_count(&http, server.addr).await, 1);
    assert_eq!(tier.hub().snapshot().evictions, 0);

    let _ = server.shutdown.send(());
}
