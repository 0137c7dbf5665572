// AWS Lambda binary entry point
//
// Build with: cargo build -p cloudfront2firehose-lambda --release

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    cloudfront2firehose_lambda::run().await
}
