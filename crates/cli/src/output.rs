/// Builds the indented `● Header` / `key: value` listings printed by every command.
#[derive(Default)]
pub struct OutputBuilder {
    indent: usize,
    header: Option<String>,
    properties: Vec<(String, String)>,
    items: Vec<String>,
    children: Vec<String>,
}

impl OutputBuilder {
    pub fn new<H: ToString>(header: H) -> Self {
        Self {
            header: Some(header.to_string()),
            ..Default::default()
        }
    }

    pub fn build(self) -> String {
        let OutputBuilder {
            indent,
            header,
            properties,
            items,
            children,
        } = self;

        let mut output = String::new();
        let width = properties.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

        if let Some(header) = header {
            output.push_str(&format!("{:indent$}● {header}\n", ""));
        }

        for (key, value) in &properties {
            output.push_str(&format!(
                "{:indent$}{key:>width$}: {value}\n",
                "",
                indent = indent + 4
            ));
        }

        for item in &items {
            output.push_str(&format!("{:indent$}- {item}\n", "", indent = indent + 4));
        }

        for child in children {
            output.push_str(&child);
        }

        output
    }

    /// Properties are printed in the order they were added, right-aligned on the colon.
    pub fn property<K: ToString, V: ToString>(&mut self, key: K, value: V) {
        self.properties.push((key.to_string(), value.to_string()));
    }

    pub fn item<V: ToString>(&mut self, value: V) {
        self.items.push(value.to_string());
    }

    pub fn section<H: Into<String>>(
        &mut self,
        header: H,
        builder: impl FnOnce(&mut OutputBuilder),
    ) {
        let mut section_builder = OutputBuilder {
            indent: self.indent + 2,
            header: Some(header.into()),
            ..Default::default()
        };

        (builder)(&mut section_builder);

        self.children.push(section_builder.build());
    }
}

#[cfg(test)]
mod test {
    use expect_test::expect;

    use super::OutputBuilder;

    #[test]
    fn renders_nested_sections() {
        let mut output = OutputBuilder::new("Extensions");
        output.property("Count", 1);
        output.section("name-every-child", |builder| {
            builder.property("Owner", "com.becked.nameeverychild");
            builder.property("Overrides", 1);
            builder.item("Character::isValidChooseName");
        });

        expect![[r#"
            ● Extensions
                Count: 1
              ● name-every-child
                      Owner: com.becked.nameeverychild
                  Overrides: 1
                  - Character::isValidChooseName
        "#]]
        .assert_eq(&output.build());
    }
}
