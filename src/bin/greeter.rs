use anyhow::Result;
use rpc_registry::{Registry, RpcError};
use rpc_registry_demo::greeter::{GREETER, SayHello, SayHelloReq, StatsReq};
use rpc_registry_demo::serve_greeter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let names = std::env::var("GREET_NAMES").unwrap_or_else(|_| "Ben,,Ada".to_string());

    let (registry, protocol) = serve_greeter(&Registry::new())?;
    println!("Registered tags: {:?}", registry.list_tags());

    let greeter = GREETER.get(&registry)?;
    let say_hello = greeter.request_fn::<SayHelloReq>();

    for name in names.split(',') {
        let request = say_hello(SayHello {
            name: name.to_string(),
        });

        match request.run(&protocol).await {
            Ok(reply) => println!("{reply}"),
            Err(RpcError::Failure(failure)) => println!("Rejected '{name}': {}", failure.reason),
            Err(e) => return Err(e.into()),
        }
    }

    let stats = greeter.request::<StatsReq>(()).run(&protocol).await?;
    println!("Greeted {} people", stats.greeted);

    Ok(())
}
