use anyhow::{Context, Result};
use query_field_resolver::ast::Record;
use query_field_resolver::config::{AppConfig, QueryRequest};
use query_field_resolver::fetch_with_query_fields;
use query_field_resolver::logging;
use query_field_resolver::memory_backend::InMemoryBackend;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// 执行一次请求并打印填充后的实体
fn run_request(backend: &InMemoryBackend, request: &QueryRequest) -> Result<()> {
    let entities: Vec<Record> = fetch_with_query_fields(
        backend,
        &request.entity_type,
        &request.filters,
        &request.fields,
    )
    .with_context(|| format!("获取 {} 实体失败", request.entity_type))?;

    println!("共 {} 个 {} 实体:", entities.len(), request.entity_type);
    println!("{}", serde_json::to_string_pretty(&entities)?);
    Ok(())
}

/// 把逗号分隔的字段列表解析为字段名
fn parse_fields(line: &str) -> Vec<String> {
    line.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

fn main() -> Result<()> {
    let config = AppConfig::load().context("加载配置失败")?;
    logging::init(config.log_profile);

    println!("--- Query Field Resolver: 查询字段解析 ---");
    println!("\n[配置信息]:");
    println!("fixture: {}", config.fixture_path.display());
    println!("实体类型: {}", config.request.entity_type);
    println!("请求字段: {}", config.request.fields.join(", "));

    let backend = InMemoryBackend::from_json_file(&config.fixture_path)
        .with_context(|| format!("无法加载 fixture {}", config.fixture_path.display()))?;

    println!("\n[默认请求]:");
    run_request(&backend, &config.request)?;

    println!("\n输入以逗号分隔的字段列表重新查询, 空行退出");
    let mut editor = DefaultEditor::new().context("无法初始化命令行编辑器")?;

    loop {
        match editor.readline("fields> ") {
            Ok(line) => {
                let fields = parse_fields(&line);
                if fields.is_empty() {
                    break;
                }
                editor.add_history_entry(line.as_str()).ok();

                let request = QueryRequest {
                    fields,
                    ..config.request.clone()
                };
                if let Err(e) = run_request(&backend, &request) {
                    println!("✗ {:#}", e);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("读取输入失败"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields() {
        assert_eq!(parse_fields(" code, sg_shot_count ,,"), vec!["code", "sg_shot_count"]);
        assert!(parse_fields("   ").is_empty());
    }
}
