#[tokio::main]
async fn main() {
    moment::web::run().await;
}
