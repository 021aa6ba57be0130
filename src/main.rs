use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use cognitive_load::utils::logging;
use cognitive_load::{App, Config};
use tracing::info;

const USAGE: &str = "用法:
  cognitive-load batch [YYYY-MM-DD]
  cognitive-load score <student_id> [YYYY-MM-DD] [days]
  cognitive-load impact <deadline_id>";

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    if config.verbose_logging {
        logging::init_verbose();
    } else {
        logging::init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match args.first() {
        Some(c) => c.as_str(),
        None => bail!("缺少子命令\n{}", USAGE),
    };

    let app = App::initialize(config).await?;
    let today = Local::now().date_naive();

    match command {
        "batch" => {
            let date = parse_date_arg(args.get(1))?.unwrap_or(today);

            // Ctrl-C 时不再开始新的学生
            let signal = app.abort_signal();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal.abort();
                }
            });

            let summary = app.run_batch(date).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "score" => {
            let student_id = args.get(1).context(USAGE)?;
            let date = parse_date_arg(args.get(2))?.unwrap_or(today);
            match args.get(3) {
                Some(days) => {
                    let days: usize = days
                        .parse()
                        .with_context(|| format!("天数无效: {}", days))?;
                    let forecast = app.forecast(student_id, date, days).await?;
                    println!("{}", serde_json::to_string_pretty(&forecast)?);
                }
                None => {
                    let load = app.score(student_id, date).await?;
                    println!("{}", serde_json::to_string_pretty(&load)?);
                }
            }
        }
        "impact" => {
            let deadline_id = args.get(1).context(USAGE)?;
            let outcome = app.impact(deadline_id, today).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        other => bail!("未知子命令: {}\n{}", other, USAGE),
    }

    info!("✅ 完成");
    Ok(())
}

fn parse_date_arg(arg: Option<&String>) -> Result<Option<NaiveDate>> {
    arg.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("日期格式无效: {}", s))
    })
    .transpose()
}
