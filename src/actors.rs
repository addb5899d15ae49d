use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info_span, Instrument};

const MAILBOX_SIZE: usize = 64;

/// State that is only ever touched by its own task.
///
/// Messages are handled one at a time in the order they were sent.
#[async_trait]
pub trait Actor: Send + 'static {
    type Message: Send + 'static;
    type Response: Send + 'static;

    async fn handle_message(&mut self, message: Self::Message) -> Self::Response;
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("The actor has stopped")]
pub struct ActorStopped;

pub struct ActorHandle<T: Actor> {
    message_sender: mpsc::Sender<MessageWrap<T::Message, T::Response>>,
}

impl<T: Actor> Clone for ActorHandle<T> {
    fn clone(&self) -> Self {
        ActorHandle {
            message_sender: self.message_sender.clone(),
        }
    }
}

impl<T: Actor> ActorHandle<T> {
    /// Moves the actor onto its own task. It stops once every handle is dropped.
    pub fn spawn(mut actor: T, name: &'static str) -> ActorHandle<T> {
        let (message_sender, mut message_receiver) =
            mpsc::channel::<MessageWrap<T::Message, T::Response>>(MAILBOX_SIZE);

        tokio::spawn(
            async move {
                while let Some(MessageWrap {
                    message,
                    respond_to,
                }) = message_receiver.recv().await
                {
                    let response = actor.handle_message(message).await;
                    let _ = respond_to.send(response); // The caller may have stopped waiting
                }

                debug!("All handles are gone, stopping");
            }
            .instrument(info_span!("actor", name)),
        );

        ActorHandle { message_sender }
    }

    pub async fn send(&self, message: T::Message) -> Result<T::Response, ActorStopped> {
        let (response_sender, response_receiver) = oneshot::channel();

        self.message_sender
            .send(MessageWrap {
                message,
                respond_to: response_sender,
            })
            .await
            .map_err(|_| ActorStopped)?;

        response_receiver.await.map_err(|_| ActorStopped)
    }
}

pub struct MessageWrap<M: Send, R: Send> {
    pub message: M,
    pub respond_to: oneshot::Sender<R>,
}
