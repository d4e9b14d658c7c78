use std::sync::Arc;

use travel_assist::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    let backend = Arc::new(HttpTravelBackend::from_env()?);
    let mut conversation = Conversation::new(backend);

    if conversation.check_health().await == ApiStatus::Offline {
        eprintln!("backend is offline");
        return Ok(());
    }

    let record = conversation
        .ask("Do I need a visa to visit Japan for two weeks?")
        .await?;
    println!("{}", record.answer);
    Ok(())
}
