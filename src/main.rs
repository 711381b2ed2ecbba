#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    hmtpk_schedule::run().await
}
