//! Base kinds every syntax extension builds on: source locations, `Node`,
//! `Expression`, identifiers, literals and member access.

use crate::constraint::Constraint;
use crate::decl::DefaultValue;
use crate::error::Error;
use crate::fork::{Fork, Plugin};
use crate::shared::Shared;
use crate::value::{Node, Value};

/// Plugin declaring the base kinds.
#[derive(Debug)]
pub struct Base;

impl Plugin for Base {
    type Output = ();

    fn init(fork: &mut Fork) -> Result<(), Error> {
        let defaults = fork.use_plugin::<Shared>()?;

        fork.define("Printable").hidden_field(
            "loc",
            Constraint::or([Constraint::kind("SourceLocation"), Constraint::null()]),
            defaults.null.clone(),
        )?;

        fork.define("Node").bases(&["Printable"])?;

        fork.define("SourceLocation")
            .build(&["start", "end"])?
            .field("start", Constraint::kind("Position"))?
            .field("end", Constraint::kind("Position"))?
            .field_default(
                "source",
                Constraint::or([Constraint::string(), Constraint::null()]),
                defaults.null.clone(),
            )?;

        fork.define("Position")
            .build(&["line", "column"])?
            .field("line", Constraint::number())?
            .field("column", Constraint::number())?;

        fork.define("Expression").bases(&["Node"])?;

        fork.define("Identifier")
            .bases(&["Expression"])?
            .build(&["name"])?
            .field("name", Constraint::string())?
            .field_default("optional", Constraint::boolean(), defaults.false_value.clone())?;

        fork.define("Literal")
            .bases(&["Expression"])?
            .build(&["value"])?
            .field(
                "value",
                Constraint::or([
                    Constraint::string(),
                    Constraint::boolean(),
                    Constraint::null(),
                    Constraint::number(),
                ]),
            )?;

        fork.define("MemberExpression")
            .bases(&["Expression"])?
            .build(&["object", "property", "computed"])?
            .field("object", Constraint::kind("Expression"))?
            .field(
                "property",
                Constraint::or([Constraint::kind("Identifier"), Constraint::kind("Expression")]),
            )?
            .field_default(
                "computed",
                Constraint::boolean(),
                DefaultValue::computed(|node| Value::Bool(property_is_computed(node))),
            )?;

        Ok(())
    }
}

/// Whether a member access needs brackets, judged from its property.
fn property_is_computed(node: &Node) -> bool {
    node.path(&["property"])
        .and_then(Value::as_node)
        .and_then(Node::kind)
        .is_some_and(|kind| matches!(kind, "Literal" | "MemberExpression" | "BinaryExpression"))
}
