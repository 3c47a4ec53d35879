//! Headless explorer: opens one data set page against a live server and prints what it shows.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use std::rc::Rc;

    use anyhow::Context;
    use backend::http_utils::endpoint_client::HttpEndpointClient;
    use frontend::{
        data_definitions::explorer_config::{ExplorerConfig, init_args_from_env},
        query_engine::DataSetPage,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ExplorerConfig::from_env()?;
    let init_args = init_args_from_env()?;
    tracing::info!("opening data set {} from {}", init_args.data_set_id, config.base_url);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the runtime")?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, async move {
        let page = DataSetPage::new(&config, init_args, Rc::new(HttpEndpointClient::new()))?;
        page.initialize();
        page.scheduler().idle().await;

        for (target, content) in page.board().snapshot() {
            println!("{:?}: {}", target, content);
        }
        for notification in page.board().take_notifications() {
            println!("{:?}: {}", notification.level, notification.message);
        }
        println!("share link: {}", page.share_link_param());
        Ok::<_, anyhow::Error>(())
    })
}

// In the browser the page is driven by the view layer through the library.
#[cfg(target_arch = "wasm32")]
fn main() {}
