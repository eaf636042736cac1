// ==========================================
// 供应商价格表同步系统 - 命令行入口
// ==========================================
// 子命令: supplier-add / preview / commit / sync / runs
// 输出: 结构化结果以 JSON 打印到标准输出
// ==========================================

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use supplier_price_sync::config::{ColumnMapping, ParseConfig};
use supplier_price_sync::domain::price_list::PriceListMeta;
use supplier_price_sync::domain::types::ParseFormat;
use supplier_price_sync::{logging, PriceListApi, APP_NAME, VERSION};

#[derive(Parser)]
#[command(name = "supplier-price-sync", version, about = "供应商价格表导入与同步")]
struct Cli {
    /// 数据库文件路径（缺省取用户数据目录）
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 登记/更新供应商
    SupplierAdd {
        /// 供应商 ID
        #[arg(long)]
        id: String,
        /// 供应商名称
        #[arg(long)]
        name: String,
        /// 优选供应商（冲突裁决优先）
        #[arg(long)]
        preferred: bool,
    },

    /// 预览价格文件（不落库）
    Preview {
        /// 价格文件路径
        file: PathBuf,
        /// 解析配置 JSON 文件（缺省: 逗号分隔 + 表头）
        #[arg(long)]
        config: Option<PathBuf>,
        /// 列映射 JSON 文件（缺省: 空映射）
        #[arg(long)]
        mapping: Option<PathBuf>,
        /// 按定宽列解析
        #[arg(long)]
        fixed_width: bool,
    },

    /// 提交价格表
    Commit {
        /// 价格文件路径
        file: PathBuf,
        /// 供应商 ID
        #[arg(long)]
        supplier: String,
        /// 价格表名称（同名提交取代旧表）
        #[arg(long)]
        name: String,
        /// 币种（条目缺省币种）
        #[arg(long)]
        currency: String,
        /// 生效日期 YYYY-MM-DD（缺省今天）
        #[arg(long)]
        effective: Option<NaiveDate>,
        /// 失效日期 YYYY-MM-DD
        #[arg(long)]
        expiry: Option<NaiveDate>,
        /// 优先级（越小越高，缺省 100）
        #[arg(long, default_value_t = 100)]
        rank: i32,
        /// 解析配置 JSON 文件
        #[arg(long)]
        config: Option<PathBuf>,
        /// 列映射 JSON 文件
        #[arg(long)]
        mapping: Option<PathBuf>,
    },

    /// 同步价格表到商品目录
    Sync {
        /// 价格表 ID
        price_list_id: String,
        /// 跳过优选供应商判定
        #[arg(long)]
        force: bool,
        /// 只计算裁决，不改目录价
        #[arg(long)]
        dry_run: bool,
    },

    /// 查询最近的同步运行记录
    Runs {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

/// 缺省数据库路径: <用户数据目录>/supplier-price-sync/price_sync.db
fn default_db_path() -> PathBuf {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("supplier-price-sync").join("price_sync.db")
}

fn load_parse_config(path: Option<&PathBuf>, fixed_width: bool) -> Result<ParseConfig, Box<dyn Error>> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)?;
            Ok(serde_json::from_str(&text)?)
        }
        None if fixed_width => Err("定宽解析必须通过 --config 提供列定义".into()),
        None => Ok(ParseConfig::delimited(None, true)),
    }
}

fn load_mapping(path: Option<&PathBuf>) -> Result<ColumnMapping, Box<dyn Error>> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(ColumnMapping::new()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    tracing::info!("{} v{}", APP_NAME, VERSION);

    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(default_db_path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db_path = db_path.to_string_lossy().to_string();
    tracing::info!(db_path = %db_path, "使用数据库");

    let api = PriceListApi::new(db_path);

    match cli.command {
        Commands::SupplierAdd { id, name, preferred } => {
            api.register_supplier(&id, &name, preferred).await?;
            println!("供应商已登记: {}", id);
        }

        Commands::Preview {
            file,
            config,
            mapping,
            fixed_width,
        } => {
            let content = std::fs::read_to_string(&file)?;
            let parse_config = load_parse_config(config.as_ref(), fixed_width)?;
            let column_mapping = load_mapping(mapping.as_ref())?;
            let file_type = if fixed_width {
                Some(ParseFormat::FixedWidth)
            } else {
                None
            };

            let result = api.preview(&content, file_type, &parse_config, &column_mapping)?;
            print_json(&result)?;
        }

        Commands::Commit {
            file,
            supplier,
            name,
            currency,
            effective,
            expiry,
            rank,
            config,
            mapping,
        } => {
            let content = std::fs::read_to_string(&file)?;
            let parse_config = load_parse_config(config.as_ref(), false)?;
            let column_mapping = load_mapping(mapping.as_ref())?;

            let meta = PriceListMeta {
                name,
                effective_date: effective.unwrap_or_else(|| Utc::now().date_naive()),
                expiry_date: expiry,
                currency_code: currency,
                priority_rank: rank,
                upload_filename: file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string()),
            };

            let outcome = api
                .commit_price_list(&supplier, &parse_config, &column_mapping, &content, meta)
                .await?;
            print_json(&outcome)?;
        }

        Commands::Sync {
            price_list_id,
            force,
            dry_run,
        } => {
            let report = api.sync(&price_list_id, force, dry_run).await?;
            print_json(&report)?;
        }

        Commands::Runs { limit } => {
            let runs = api.recent_sync_runs(limit).await?;
            print_json(&runs)?;
        }
    }

    Ok(())
}
