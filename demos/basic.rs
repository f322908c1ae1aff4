use moodtrack_realtime_rs::{RealtimeClient, RealtimeClientOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Create client
    let client = RealtimeClient::builder(RealtimeClientOptions::for_user("1"))
        .on_connect(|| println!("Connected!"))
        .on_message(|frame| println!("Frame: {frame}"))
        .build()?;

    // Connect
    println!("Connecting to MoodTrack messaging...");
    client.connect().await;

    // Keep connection alive
    tokio::signal::ctrl_c().await?;

    // Disconnect
    println!("Disconnecting...");
    client.disconnect().await;
    println!("Disconnected!");

    Ok(())
}
