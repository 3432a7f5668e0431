use punch_core::{ErrorClass, IdentityLinkStore, InMemoryLinkStore, InMemoryPunchStore, IngestContext, PunchEventStore};
use punch_domain::IngestResult;
use punch_persistence::pg::{build_dev_pool_from_env, PgIdentityLinkStore, PgPunchEventStore, PoolProvider};
use punchflow::{AppConfig, IngestPipeline};

const USAGE: &str =
    "uso: punch-cli ingest --provider <dingtalk|wecom> --corp <ID> --event <ID> --file <RUTA> [--tenant <ID>] [--initiator <ID>]";

const EXIT_OK: i32 = 0;
const EXIT_USAGE: i32 = 2;
const EXIT_VALIDATION: i32 = 3;
const EXIT_INTEGRITY: i32 = 4;
const EXIT_STORAGE: i32 = 5;

#[derive(Debug, PartialEq, Eq)]
struct IngestArgs {
    provider: String,
    corp: String,
    event: String,
    file: String,
    tenant: String,
    initiator: Option<String>,
}

fn parse_ingest(args: &[String]) -> Result<IngestArgs, String> {
    let mut provider = None;
    let mut corp = None;
    let mut event = None;
    let mut file = None;
    let mut tenant = None;
    let mut initiator = None;
    let mut it = args.iter();
    while let Some(flag) = it.next() {
        let slot = match flag.as_str() {
            "--provider" => &mut provider,
            "--corp" => &mut corp,
            "--event" => &mut event,
            "--file" => &mut file,
            "--tenant" => &mut tenant,
            "--initiator" => &mut initiator,
            other => return Err(format!("flag desconocido: {other}")),
        };
        match it.next() {
            Some(v) => *slot = Some(v.clone()),
            None => return Err(format!("falta valor para {flag}")),
        }
    }
    let corp: String = corp.ok_or("falta --corp")?;
    Ok(IngestArgs { provider: provider.ok_or("falta --provider")?,
                    event: event.ok_or("falta --event")?,
                    file: file.ok_or("falta --file")?,
                    tenant: tenant.unwrap_or_else(|| corp.clone()),
                    corp,
                    initiator })
}

fn exit_code(class: ErrorClass) -> i32 {
    match class {
        ErrorClass::Validation => EXIT_VALIDATION,
        ErrorClass::Integrity => EXIT_INTEGRITY,
        ErrorClass::Retryable | ErrorClass::Permanent => EXIT_STORAGE,
    }
}

fn print_result(result: &IngestResult) {
    match serde_json::to_string(result) {
        Ok(line) => println!("{line}"),
        Err(e) => eprintln!("[punch ingest] no se pudo serializar resultado: {e}"),
    }
}

fn run<L: IdentityLinkStore, P: PunchEventStore>(pipeline: IngestPipeline<L, P>, args: &IngestArgs, payload: &[u8]) -> i32 {
    let ctx = IngestContext::background();
    match pipeline.ingest_delivery(&ctx, &args.tenant, &args.provider, &args.event, &args.corp, payload) {
        Ok(results) => {
            results.iter().for_each(print_result);
            EXIT_OK
        }
        Err(e) => {
            e.completed().iter().for_each(print_result);
            eprintln!("[punch ingest] {e}");
            exit_code(e.class())
        }
    }
}

fn main() {
    // Cargar .env si existe para obtener DATABASE_URL
    let _ = dotenvy::dotenv();
    let argv: Vec<String> = std::env::args().collect();
    if argv.len() < 2 || argv[1] != "ingest" {
        eprintln!("{USAGE}");
        std::process::exit(EXIT_USAGE);
    }
    let args = match parse_ingest(&argv[2..]) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("[punch ingest] {msg}\n{USAGE}");
            std::process::exit(EXIT_USAGE);
        }
    };
    let mut config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[punch ingest] {e}");
            std::process::exit(EXIT_USAGE);
        }
    };
    let payload = match std::fs::read(&args.file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("[punch ingest] no se pudo leer {}: {e}", args.file);
            std::process::exit(EXIT_USAGE);
        }
    };
    if let Some(initiator) = &args.initiator {
        config.initiator_id = initiator.clone();
    }

    // Con DATABASE_URL se usa Postgres; sin ella, stores en memoria (todo queda unmapped).
    let code = if config.database.is_some() {
        match build_dev_pool_from_env() {
            Ok(pool) => {
                let links = PgIdentityLinkStore::new(PoolProvider { pool: pool.clone() });
                let punches = PgPunchEventStore::new(PoolProvider { pool });
                run(IngestPipeline::from_config(links, punches, &config), &args, &payload)
            }
            Err(e) => {
                eprintln!("[punch ingest] pool error: {e}");
                EXIT_STORAGE
            }
        }
    } else {
        let pipeline = IngestPipeline::from_config(InMemoryLinkStore::new(), InMemoryPunchStore::new(), &config);
        run(pipeline, &args, &payload)
    };
    std::process::exit(code);
}
