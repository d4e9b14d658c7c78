use std::sync::Arc;

use travel_assist::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    travel_assist::init_observability();
    let backend = Arc::new(HttpTravelBackend::from_env()?);
    let mut conversation = Conversation::new(backend);

    let mut answer = conversation
        .start_stream("What should I pack for a week in Iceland in March?")
        .await?;

    while let Some(update) = answer.next_update().await {
        match update {
            AnswerUpdate::Delta { text, .. } => print!("{text}"),
            AnswerUpdate::Completed { .. } => println!(),
            AnswerUpdate::Failed { failure } => eprintln!("answer failed: {failure}"),
            AnswerUpdate::Started { .. } => {}
        }
    }

    let record = answer.finish().await?;
    conversation.complete(record);
    Ok(())
}
