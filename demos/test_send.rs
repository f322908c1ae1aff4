use moodtrack_realtime_rs::{RealtimeClient, RealtimeClientOptions};
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("🦀 Testing message send\n");

    let base_url =
        std::env::var("REALTIME_URL").unwrap_or_else(|_| "ws://localhost:8000".to_string());
    let user_id = std::env::var("REALTIME_USER_ID").unwrap_or_else(|_| "1".to_string());
    let recipient = std::env::var("REALTIME_RECIPIENT_ID").unwrap_or_else(|_| "2".to_string());

    println!("📡 Connecting to: {} as user {}\n", base_url, user_id);

    let client = RealtimeClient::builder(RealtimeClientOptions {
        base_url: Some(base_url),
        ..RealtimeClientOptions::for_user(user_id)
    })
    .on_message(|frame| println!("📨 Received: {frame}"))
    .on_error(|err| eprintln!("❌ {err}"))
    .build()?;

    println!("✅ Test 1: Sending before connect is dropped...");
    let sent = client.send_message(&json!({ "type": "typing" })).await;
    println!("   sent = {}\n", sent);

    println!("✅ Test 2: Connecting...");
    client.connect().await;
    let mut states = client.state_changes();
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(|s| s.is_connected())).await??;
    println!("✅ Connected!\n");

    println!("✅ Test 3: Typing indicator...");
    client.send_typing(recipient.as_str()).await;

    println!("✅ Test 4: Chat message...");
    let sent = client
        .send_chat_message(recipient.as_str(), "Hello from Rust!")
        .await;
    println!("   sent = {}\n", sent);

    println!("✅ Test 5: Mark conversation read...");
    client.send_mark_read(recipient.as_str()).await;

    println!("⏳ Waiting 2 seconds for replies...");
    tokio::time::sleep(Duration::from_secs(2)).await;

    println!("\n✅ Test 6: Disconnecting...");
    client.disconnect().await;
    println!("✅ Disconnected!\n");

    println!("🎉 All tests completed!");

    Ok(())
}
