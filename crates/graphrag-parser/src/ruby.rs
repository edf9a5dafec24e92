//! Vagrantfile parser (spec §4.3): the Vagrant Ruby DSL is regular enough
//! that a line-oriented regex scan suffices, in the same spirit as the
//! Jinja parser's regex fallback — no tree-sitter-ruby grammar is bundled.

use std::sync::LazyLock;

use regex::Regex;
use std::path::Path;

use crate::{ParseMetadata, ParseResult, Parser, RubyMeta};

static BOX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\.box\s*=\s*["']([^"']+)["']"#).unwrap());
static NETWORK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"config\.vm\.network\s*(?:["']([^"']+)["']|:(\w+))"#).unwrap());
static PROVISION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"config\.vm\.provision\s*(?:["']([^"']+)["']|:(\w+))"#).unwrap());

pub struct RubyParser;

impl Parser for RubyParser {
    fn parse(&self, _path: &Path, source: &[u8]) -> ParseResult {
        let content = match std::str::from_utf8(source) {
            Ok(s) => s,
            Err(e) => return ParseResult::failed(format!("not valid utf-8: {e}")),
        };

        let mut boxes = Vec::new();
        let mut networks = Vec::new();
        let mut provisioners = Vec::new();

        for line in content.lines() {
            if let Some(caps) = BOX.captures(line) {
                boxes.push(caps[1].to_string());
            }
            if let Some(caps) = NETWORK.captures(line) {
                networks.push(caps.get(1).or(caps.get(2)).unwrap().as_str().to_string());
            }
            if let Some(caps) = PROVISION.captures(line) {
                provisioners.push(caps.get(1).or(caps.get(2)).unwrap().as_str().to_string());
            }
        }

        ParseResult {
            success: true,
            errors: Vec::new(),
            root: None,
            metadata: ParseMetadata::Ruby(RubyMeta {
                boxes,
                networks,
                provisioners,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_box_networks_and_provisioners() {
        let src = br#"
Vagrant.configure("2") do |config|
  config.vm.box = "generic/ubuntu2204"
  config.vm.network "private_network", ip: "192.168.56.10"
  config.vm.network :forwarded_port, guest: 80, host: 8080
  config.vm.provision "ansible" do |ansible|
    ansible.playbook = "site.yml"
  end
end
"#;
        let result = RubyParser.parse(Path::new("Vagrantfile"), src);
        let ParseMetadata::Ruby(meta) = result.metadata else {
            panic!("expected ruby metadata");
        };
        assert_eq!(meta.boxes, vec!["generic/ubuntu2204".to_string()]);
        assert_eq!(
            meta.networks,
            vec!["private_network".to_string(), "forwarded_port".to_string()]
        );
        assert_eq!(meta.provisioners, vec!["ansible".to_string()]);
    }
}
