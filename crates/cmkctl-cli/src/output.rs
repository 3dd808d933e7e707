//! Output formatting: JSON passthrough and `;`-separated reports

use std::io::{self, Write};

use cmkctl_api::{Tag, TagGroupOption};
use cmkctl_client::{ApiResult, TagHistogram};
use serde_json::Value;

/// Response body as compact JSON, or the raw text if it is not JSON
pub fn compact_body(result: &ApiResult) -> String {
    match result.json_value() {
        Ok(Value::Null) => String::new(),
        Ok(value) => value.to_string(),
        Err(_) => result.text().to_string(),
    }
}

/// Print one result, or the dry-run marker when nothing was sent
pub fn write_result(out: &mut impl Write, result: Option<&ApiResult>) -> io::Result<()> {
    match result {
        Some(result) => {
            let body = compact_body(result);
            if body.is_empty() {
                writeln!(out, "{}", result.status)
            } else {
                writeln!(out, "{body}")
            }
        }
        None => writeln!(out, "doit: false"),
    }
}

/// Print one line per result, in request order
pub fn write_results(out: &mut impl Write, results: &[Option<ApiResult>]) -> io::Result<()> {
    if !results.is_empty() && results.iter().all(Option::is_none) {
        return writeln!(out, "doit: false");
    }
    for result in results {
        write_result(out, result.as_ref())?;
    }
    Ok(())
}

/// `host;tag_group;value`
pub fn write_tags(out: &mut impl Write, tags: &[Tag]) -> io::Result<()> {
    writeln!(out, "host;tag_group;value")?;
    for tag in tags {
        writeln!(out, "{};{};{}", tag.host, tag.tag_group, tag.value)?;
    }
    Ok(())
}

/// `tag_group;tag_group_value;tag_group_value_title`
pub fn write_tag_group_options(out: &mut impl Write, options: &[TagGroupOption]) -> io::Result<()> {
    writeln!(out, "tag_group;tag_group_value;tag_group_value_title")?;
    for option in options {
        writeln!(
            out,
            "{};{};{}",
            option.tag_group, option.value_id, option.value_title
        )?;
    }
    Ok(())
}

/// `tag_group;tag_value;host`, with an empty host field for unused values
pub fn write_histogram(out: &mut impl Write, histogram: &TagHistogram) -> io::Result<()> {
    writeln!(out, "tag_group;tag_value;host")?;
    for ((tag_group, value), hosts) in histogram.iter() {
        if hosts.is_empty() {
            writeln!(out, "{tag_group};{value};")?;
        }
        for host in hosts {
            writeln!(out, "{tag_group};{value};{host}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use cmkctl_client::tags::tag_histogram;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;

    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn option(group: &str, id: &str, title: &str) -> TagGroupOption {
        TagGroupOption {
            tag_group: group.into(),
            value_id: id.into(),
            value_title: title.into(),
            aux_tags: Vec::new(),
        }
    }

    fn tag(host: &str, group: &str, value: &str) -> Tag {
        Tag {
            host: host.into(),
            tag_group: group.into(),
            value: value.into(),
        }
    }

    #[test]
    fn test_tags_report() {
        let out = render(|buf| write_tags(buf, &[tag("web01", "tag_env", "prod")]));
        assert_eq!(out, "host;tag_group;value\nweb01;tag_env;prod\n");
    }

    #[test]
    fn test_tag_group_report() {
        let out = render(|buf| {
            write_tag_group_options(buf, &[option("tag_env", "prod", "Production")])
        });
        assert_eq!(
            out,
            "tag_group;tag_group_value;tag_group_value_title\ntag_env;prod;Production\n"
        );
    }

    #[test]
    fn test_histogram_report_lists_unused_values() {
        let options = [
            option("tag_env", "prod", "Production"),
            option("tag_env", "dev", "Development"),
        ];
        let tags = [
            tag("web01", "tag_env", "prod"),
            tag("web02", "tag_env", "prod"),
        ];
        let histogram = tag_histogram(&options, &tags).unwrap();

        let out = render(|buf| write_histogram(buf, &histogram));
        assert_eq!(
            out,
            "tag_group;tag_value;host\n\
             tag_env;prod;web01\n\
             tag_env;prod;web02\n\
             tag_env;dev;\n"
        );
    }

    #[test]
    fn test_dry_run_marker() {
        let out = render(|buf| write_result(buf, None));
        assert_eq!(out, "doit: false\n");

        let out = render(|buf| write_results(buf, &[None, None]));
        assert_eq!(out, "doit: false\n");
    }

    #[test]
    fn test_result_body_compacted() {
        let result = ApiResult::new(StatusCode::OK, HeaderMap::new(), "{\n  \"id\": \"web01\"\n}");
        let out = render(|buf| write_result(buf, Some(&result)));
        assert_eq!(out, "{\"id\":\"web01\"}\n");
    }
}
