use utoipa::OpenApi;
use wordmania_back::services::documentation::ApiDoc;

fn main() -> Result<(), serde_json::Error> {
    let doc = ApiDoc::openapi();
    println!("{}", doc.to_pretty_json()?);
    Ok(())
}
