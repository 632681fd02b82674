use biobank_client::config::AppConfig;
use biobank_client::seed::Factory;
use biobank_client::store::{BiobankApi, Method, MockApi};
use biobank_client::{client_from_env, Centre, ListOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging, keeping the HTTP stack quiet
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("hyper", LevelFilter::Warn)
        .parse_default_env()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let demo = args.iter().any(|a| a == "--demo");
    let filter = args.iter().find(|a| !a.starts_with("--")).cloned();

    let config = AppConfig::load()?;
    let mut options = ListOptions::new().with_limit(config.paging.default_limit);
    if let Some(filter) = filter {
        options = options.with_filter(filter);
    }

    if demo {
        println!("Biobank client: demo data");
        let api = demo_api(&options);
        list_centres(&api, &options).await
    } else {
        let api = client_from_env()?;
        println!("Biobank client: {}", api.base_url());
        list_centres(&api, &options).await
    }
}

/// A scripted backend answering a single centre listing with generated centres.
fn demo_api(options: &ListOptions) -> MockApi {
    let mut factory = Factory::new();
    let centres = (0..3).map(|_| factory.centre()).collect::<Vec<_>>();
    let total = centres.len() as u64;
    let limit = options.limit.unwrap_or(10);

    let api = MockApi::new();
    api.expect(Method::Get, Centre::REST_API_URL)
        .with_query(options.to_query())
        .respond(factory.paged_result(centres, 1, limit, total));
    api
}

async fn list_centres<A: BiobankApi + ?Sized>(api: &A, options: &ListOptions) -> anyhow::Result<()> {
    let page = Centre::list(api, options).await?;

    println!("{} centre(s), page {} of {}", page.total, page.page, page.max_pages);
    for centre in &page.items {
        println!(
            "  {:<24} {:<10} {}",
            centre.name,
            format!("{:?}", centre.state).to_lowercase(),
            centre.description.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
