//! Dialplan document rendering

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Cursor;

use super::{ParkPlan, PARK_EXTENSION_NAME};
use crate::error::{AgentError, Result};

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn write(writer: &mut XmlWriter, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| AgentError::Xml(e.to_string()))
}

fn open(writer: &mut XmlWriter, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
    let mut element = BytesStart::new(name);
    for attribute in attributes {
        element.push_attribute(*attribute);
    }
    write(writer, Event::Start(element))
}

fn close(writer: &mut XmlWriter, name: &str) -> Result<()> {
    write(writer, Event::End(BytesEnd::new(name)))
}

impl ParkPlan {
    /// Render the plan as the engine's dialplan document:
    ///
    /// ```xml
    /// <document type="freeswitch/xml">
    ///   <section name="dialplan">
    ///     <context name="default">
    ///       <extension name="event_agent_park">
    ///         <condition field="destination_number" expression="^(.+)$">
    ///           <action application="set" data="hangup_after_bridge=true"/>
    ///           ...
    /// ```
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        open(&mut writer, "document", &[("type", "freeswitch/xml")])?;
        open(&mut writer, "section", &[("name", "dialplan")])?;
        open(&mut writer, "context", &[("name", self.context.as_str())])?;
        open(&mut writer, "extension", &[("name", PARK_EXTENSION_NAME)])?;
        open(
            &mut writer,
            "condition",
            &[("field", "destination_number"), ("expression", "^(.+)$")],
        )?;

        for action in &self.actions {
            let mut element = BytesStart::new("action");
            element.push_attribute(("application", action.application.as_str()));
            element.push_attribute(("data", action.data.as_str()));
            write(&mut writer, Event::Empty(element))?;
        }

        for name in ["condition", "extension", "context", "section", "document"] {
            close(&mut writer, name)?;
        }

        String::from_utf8(writer.into_inner().into_inner()).map_err(|e| AgentError::Xml(e.to_string()))
    }
}
