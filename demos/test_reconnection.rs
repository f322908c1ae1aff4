use moodtrack_realtime_rs::{ConnectionState, RealtimeClient, RealtimeClientOptions};
use std::time::Duration;

/// Exercise reconnection against a running messaging server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing to see logs
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("🦀 Testing Reconnection\n");

    let base_url =
        std::env::var("REALTIME_URL").unwrap_or_else(|_| "ws://localhost:8000".to_string());
    let user_id = std::env::var("REALTIME_USER_ID").unwrap_or_else(|_| "1".to_string());

    println!("📡 Connecting to: {} as user {}\n", base_url, user_id);

    let client = RealtimeClient::builder(RealtimeClientOptions {
        base_url: Some(base_url),
        reconnect_delay: Some(1_000),
        max_reconnect_attempts: Some(3),
        ..RealtimeClientOptions::for_user(user_id)
    })
    .on_disconnect(|info| println!("🔌 Closed: {} {}", info.code, info.reason))
    .on_error(|err| eprintln!("❌ {err}"))
    .build()?;

    let mut states = client.state_changes();

    // Test 1: Connect and verify
    println!("✅ Test 1: Initial connection...");
    client.connect().await;
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(|s| s.is_connected())).await??;
    println!("✅ Connected successfully!\n");

    tokio::time::sleep(Duration::from_secs(2)).await;

    // Test 2: Manual disconnect should NOT trigger reconnection
    println!("✅ Test 2: Manual disconnect (should NOT auto-reconnect)...");
    client.disconnect().await;
    assert!(!client.is_connected(), "Should be disconnected");

    println!("⏳ Waiting 5 seconds to verify no auto-reconnect...");
    tokio::time::sleep(Duration::from_secs(5)).await;

    if client.state() == ConnectionState::Disconnected {
        println!("✅ Correctly stayed disconnected after manual disconnect!\n");
    } else {
        return Err("Should NOT reconnect after manual disconnect".into());
    }

    // Test 3: Explicit reconnect
    println!("✅ Test 3: Explicit reconnect...");
    client.reconnect().await;
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(|s| s.is_connected())).await??;
    println!("✅ Reconnected!\n");

    // Test 4: Stop the server to watch backoff
    println!("✅ Test 4: Stop the server now to watch the backoff (Ctrl+C to skip)...");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        res = states.wait_for(|s| *s == ConnectionState::Exhausted) => {
            res?;
            println!(
                "✅ Gave up after {} attempts\n",
                client.reconnect_attempts().await
            );
        }
    }

    client.disconnect().await;
    println!("🎉 Reconnection test finished!");

    Ok(())
}
