//! JSX kinds: elements, fragments, attributes, expression containers,
//! identifiers and text.

use crate::constraint::Constraint;
use crate::decl::DefaultValue;
use crate::def::base::Base;
use crate::error::Error;
use crate::fork::{Fork, Plugin};
use crate::shared::Shared;
use crate::value::Value;

/// Plugin declaring the JSX kinds on top of [`Base`].
#[derive(Debug)]
pub struct Jsx;

fn element_name() -> Constraint {
    Constraint::or([
        Constraint::kind("JSXIdentifier"),
        Constraint::kind("JSXNamespacedName"),
        Constraint::kind("JSXMemberExpression"),
    ])
}

fn attributes() -> Constraint {
    Constraint::array_of(Constraint::or([
        Constraint::kind("JSXAttribute"),
        Constraint::kind("JSXSpreadAttribute"),
    ]))
}

fn children() -> Constraint {
    Constraint::array_of(Constraint::or([
        Constraint::kind("JSXElement"),
        Constraint::kind("JSXExpressionContainer"),
        Constraint::kind("JSXFragment"),
        Constraint::kind("JSXText"),
        // Some parsers emit plain literals for text children.
        Constraint::kind("Literal"),
    ]))
}

/// Copies `field` from the element's opening tag.
fn from_opening(field: &'static str) -> DefaultValue {
    DefaultValue::computed(move |node| {
        node.path(&["openingElement", field])
            .cloned()
            .unwrap_or(Value::Null)
    })
}

impl Plugin for Jsx {
    type Output = ();

    fn init(fork: &mut Fork) -> Result<(), Error> {
        fork.use_plugin::<Base>()?;
        let defaults = fork.use_plugin::<Shared>()?;

        fork.define("JSXAttribute")
            .bases(&["Node"])?
            .build(&["name", "value"])?
            .field(
                "name",
                Constraint::or([
                    Constraint::kind("JSXIdentifier"),
                    Constraint::kind("JSXNamespacedName"),
                ]),
            )?
            .field_default(
                "value",
                Constraint::or([
                    Constraint::kind("Literal"),
                    Constraint::kind("JSXExpressionContainer"),
                    Constraint::null(),
                ]),
                defaults.null.clone(),
            )?;

        fork.define("JSXIdentifier")
            .bases(&["Identifier"])?
            .build(&["name"])?
            .field("name", Constraint::string())?;

        fork.define("JSXNamespacedName")
            .bases(&["Node"])?
            .build(&["namespace", "name"])?
            .field("namespace", Constraint::kind("JSXIdentifier"))?
            .field("name", Constraint::kind("JSXIdentifier"))?;

        fork.define("JSXMemberExpression")
            .bases(&["MemberExpression"])?
            .build(&["object", "property"])?
            .field(
                "object",
                Constraint::or([
                    Constraint::kind("JSXIdentifier"),
                    Constraint::kind("JSXMemberExpression"),
                ]),
            )?
            .field("property", Constraint::kind("JSXIdentifier"))?
            .field_default("computed", Constraint::boolean(), defaults.false_value.clone())?;

        fork.define("JSXSpreadAttribute")
            .bases(&["Node"])?
            .build(&["argument"])?
            .field("argument", Constraint::kind("Expression"))?;

        fork.define("JSXExpressionContainer")
            .bases(&["Expression"])?
            .build(&["expression"])?
            .field("expression", Constraint::kind("Expression"))?;

        fork.define("JSXElement")
            .bases(&["Expression"])?
            .build(&["openingElement", "closingElement", "children"])?
            .field("openingElement", Constraint::kind("JSXOpeningElement"))?
            .field_default(
                "closingElement",
                Constraint::or([Constraint::kind("JSXClosingElement"), Constraint::null()]),
                defaults.null.clone(),
            )?
            .field_default("children", children(), defaults.empty_array.clone())?
            .hidden_field("name", element_name(), from_opening("name"))?
            .hidden_field("selfClosing", Constraint::boolean(), from_opening("selfClosing"))?
            .hidden_field("attributes", attributes(), from_opening("attributes"))?;

        fork.define("JSXOpeningElement")
            .bases(&["Node"])?
            .build(&["name", "attributes", "selfClosing"])?
            .field("name", element_name())?
            .field_default("attributes", attributes(), defaults.empty_array.clone())?
            .field_default("selfClosing", Constraint::boolean(), defaults.false_value.clone())?;

        fork.define("JSXClosingElement")
            .bases(&["Node"])?
            .build(&["name"])?
            .field("name", element_name())?;

        fork.define("JSXFragment")
            .bases(&["Expression"])?
            .build(&["openingElement", "closingElement", "children"])?
            .field("openingElement", Constraint::kind("JSXOpeningFragment"))?
            .field("closingElement", Constraint::kind("JSXClosingFragment"))?
            .field_default("children", children(), defaults.empty_array.clone())?;

        fork.define("JSXOpeningFragment").bases(&["Node"])?.build(&[])?;

        fork.define("JSXClosingFragment").bases(&["Node"])?.build(&[])?;

        fork.define("JSXText")
            .bases(&["Literal"])?
            .build(&["value"])?
            .field("value", Constraint::string())?;

        fork.define("JSXEmptyExpression").bases(&["Expression"])?.build(&[])?;

        fork.define("JSXSpreadChild")
            .bases(&["Expression"])?
            .build(&["expression"])?
            .field("expression", Constraint::kind("Expression"))?;

        Ok(())
    }
}
