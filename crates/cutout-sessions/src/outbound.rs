use async_trait::async_trait;

/// Where replies for one user go.
///
/// Delivery is fire-and-forget: implementations log their own failures and
/// nothing flows back into the session.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send_text(&self, text: &str);

    /// `png` is a finished composition.
    async fn send_image(&self, png: Vec<u8>);
}
