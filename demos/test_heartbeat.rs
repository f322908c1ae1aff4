use moodtrack_realtime_rs::{RealtimeClient, RealtimeClientOptions};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    // Initialize tracing to see heartbeat logs
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("🦀 Testing Heartbeat Mechanism\n");

    let base_url =
        std::env::var("REALTIME_URL").unwrap_or_else(|_| "ws://localhost:8000".to_string());
    let user_id = std::env::var("REALTIME_USER_ID").unwrap_or_else(|_| "1".to_string());

    println!("📡 Connecting to: {} as user {}\n", base_url, user_id);

    // Short interval so a few pings show up
    let client = RealtimeClient::new(RealtimeClientOptions {
        base_url: Some(base_url),
        heartbeat_interval: Some(5_000),
        detect_missed_pong: true,
        ..RealtimeClientOptions::for_user(user_id)
    })?;

    println!("✅ Test 1: Connecting with heartbeat enabled...");
    client.connect().await;
    let mut states = client.state_changes();
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(|s| s.is_connected())).await??;
    println!("✅ Connected!\n");

    println!("⏳ Waiting 15 seconds to observe heartbeats...");
    println!("   (Watch for 'Sent ping at' and 'Ping latency' in logs)\n");

    tokio::time::sleep(Duration::from_secs(15)).await;

    println!("   last ping at: {:?}", client.last_ping_at().await);
    println!("   last latency: {:?}ms", client.last_latency().await);
    println!("   online users: {:?}\n", client.online_users());

    println!("\n✅ Test 2: Disconnecting (should stop heartbeat)...");
    client.disconnect().await;
    println!("✅ Disconnected!\n");

    println!("⏳ Waiting 10 seconds to confirm heartbeat stopped...");
    tokio::time::sleep(Duration::from_secs(10)).await;
    println!("✅ No more pings - timer was cancelled!\n");

    println!("🎉 All tests passed!");

    Ok(())
}
