//! Input blocks, selected by the source kind.

use ingestor_protocol::defaults::KAFKA_WINDOW_MILLISECONDS;
use ingestor_protocol::{CrmStream, FieldType, FileSource, IngestResult, KafkaStream, SourceKind};

use super::engine::{bare_or_quoted, quoted, Bindings, Template};
use super::{required, required_name};

const KAFKA_INPUT: Template = Template::new(
    "input/kafka",
    r#"            type = kafka
            brokers = "%(brokers)s"
            topics = %(topics)s
            encoding = string
            translator {
                type = %(translator)s
                delimiter = "%(delimiter)s"
                field.names = [%(field_names)s]
                field.types = [%(field_types)s]
            }
            window {
                enabled = true
                milliseconds = %(window_milliseconds)s
            }"#,
);

const CRM_INPUT: Template = Template::new(
    "input/sfdc",
    r#"            type = sfdc
            mode = fetch-all
            sobject = %(object)s
            sfdc: {
              partner: {
                username = "%(username)s"
                password = "%(password)s"
                token = "%(token)s"
                auth-endpoint = "%(endpoint)s"
              }
            }"#,
);

const FILESYSTEM_INPUT: Template = Template::new(
    "input/filesystem",
    r#"            type = filesystem
            path = %(path)s
            format = %(format)s"#,
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaInput {
    pub brokers: String,
    pub topics: Vec<String>,
    pub translator: String,
    pub delimiter: String,
    pub field_names: Vec<String>,
    pub field_types: Vec<FieldType>,
}

impl KafkaInput {
    pub fn bind(stream: &KafkaStream, brokers: Option<&str>) -> IngestResult<Self> {
        const INPUT: &str = "stream/kafka";
        let brokers = required_name(INPUT, "brokers", brokers)?;
        required(INPUT, "topics", Some(&stream.topics))?;
        required(INPUT, "delimiterType", Some(&stream.delimiter_type))?;
        required(INPUT, "fieldNames", Some(&stream.field_names))?;
        required(INPUT, "fieldTypes", Some(&stream.field_types))?;
        let fields = stream.declared_fields()?;
        Ok(Self {
            brokers,
            topics: stream.topic_list(),
            translator: stream.delimiter_type.trim().to_string(),
            delimiter: stream.delimiter.clone(),
            field_names: fields.iter().map(|f| f.name.clone()).collect(),
            field_types: fields.iter().map(|f| f.field_type).collect(),
        })
    }

    fn bindings(&self) -> Bindings {
        let topics = match self.topics.as_slice() {
            [single] => bare_or_quoted(single),
            many => format!(
                "[{}]",
                many.iter().map(|t| bare_or_quoted(t)).collect::<Vec<_>>().join(",")
            ),
        };
        let names: Vec<String> = self.field_names.iter().map(|n| bare_or_quoted(n)).collect();
        let types: Vec<&str> = self.field_types.iter().map(FieldType::as_str).collect();
        Bindings::from([
            ("brokers", quoted(&self.brokers)),
            ("topics", topics),
            ("translator", bare_or_quoted(&self.translator)),
            ("delimiter", quoted(&self.delimiter)),
            ("field_names", names.join(",")),
            ("field_types", types.join(",")),
            ("window_milliseconds", KAFKA_WINDOW_MILLISECONDS.to_string()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmInput {
    pub object: String,
    pub username: String,
    pub password: String,
    pub token: String,
    pub endpoint: String,
}

impl CrmInput {
    pub fn bind(stream: &CrmStream) -> IngestResult<Self> {
        const INPUT: &str = "stream/sfdc";
        Ok(Self {
            object: required_name(INPUT, "object", Some(&stream.object))?,
            username: required(INPUT, "username", Some(&stream.username))?,
            password: required(INPUT, "password", Some(&stream.password))?,
            token: required(INPUT, "token", Some(&stream.token))?,
            endpoint: required_name(INPUT, "endpointUrl", Some(&stream.endpoint_url))?,
        })
    }

    fn bindings(&self) -> Bindings {
        Bindings::from([
            ("object", bare_or_quoted(&self.object)),
            ("username", quoted(&self.username)),
            ("password", quoted(&self.password)),
            ("token", quoted(&self.token)),
            ("endpoint", quoted(&self.endpoint)),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemInput {
    pub path: String,
    pub format: String,
}

impl FilesystemInput {
    pub fn bind(file: &FileSource) -> IngestResult<Self> {
        const INPUT: &str = "file";
        let path = required_name(INPUT, "path", Some(&file.path))?;
        let format = file.format.as_ref().map(|guess| guess.format_type.as_str());
        Ok(Self {
            path,
            format: required_name(INPUT, "format", format)?,
        })
    }

    fn bindings(&self) -> Bindings {
        Bindings::from([
            ("path", bare_or_quoted(&self.path)),
            ("format", bare_or_quoted(&self.format)),
        ])
    }
}

/// The `input` step of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputBlock {
    Kafka(KafkaInput),
    Crm(CrmInput),
    Filesystem(FilesystemInput),
}

impl InputBlock {
    /// Source kinds that have an input template.
    pub fn supports(kind: SourceKind) -> bool {
        match kind {
            SourceKind::Kafka | SourceKind::Crm | SourceKind::File => true,
            SourceKind::Table | SourceKind::Query | SourceKind::Rdbms => false,
        }
    }

    pub fn template(&self) -> &'static Template {
        match self {
            InputBlock::Kafka(_) => &KAFKA_INPUT,
            InputBlock::Crm(_) => &CRM_INPUT,
            InputBlock::Filesystem(_) => &FILESYSTEM_INPUT,
        }
    }

    pub fn render(&self) -> IngestResult<String> {
        let bindings = match self {
            InputBlock::Kafka(kafka) => kafka.bindings(),
            InputBlock::Crm(crm) => crm.bindings(),
            InputBlock::Filesystem(file) => file.bindings(),
        };
        self.template().render(&bindings)
    }
}
