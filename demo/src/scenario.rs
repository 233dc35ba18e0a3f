//! A scripted walk through the cycle: two committed actions, then a
//! critical action refused on drift.

use serde::Serialize;

use lri_contracts::{cycle::ActionRequest, error::LriResult, identity::SubjectId};

use crate::runtime::Runtime;

fn show<T: Serialize>(label: &str, value: &T) -> LriResult<()> {
    println!("── {} ──", label);
    println!("{}", crate::to_pretty(value)?);
    println!();
    Ok(())
}

pub fn run(runtime: &Runtime) -> LriResult<()> {
    let a1 = SubjectId::new("a1");

    let first = runtime
        .engine
        .run_cycle(&ActionRequest::new("a1", "study").with_intention("learn"))?;
    show("cycle 1: study / learn", &first)?;

    let second = runtime
        .engine
        .run_cycle(&ActionRequest::new("a1", "study").with_intention("learn"))?;
    show("cycle 2: study / learn", &second)?;

    // A fresh agent has drift 1.0 after its first action.
    let a2 = SubjectId::new("a2");
    runtime
        .engine
        .run_cycle(&ActionRequest::new("a2", "explore").with_intention("curiosity"))?;
    match runtime
        .engine
        .run_cycle(&ActionRequest::new("a2", "critical_override").with_intention("shortcut"))
    {
        Err(e) if e.is_denial() => println!("── a2 critical_override refused: {} ──\n", e),
        Err(e) => return Err(e),
        Ok(snapshot) => show("a2 critical_override committed", &snapshot)?,
    }

    show("audit snapshot a1", &runtime.observer.snapshot(&a1)?)?;
    show("continuity a1", &runtime.observer.continuity(&a1)?)?;
    show("drift a2", &runtime.observer.drift(&a2)?)?;
    show("authority claims a2", &runtime.observer.authority_claims(&a2)?)?;
    show("relations a1", &runtime.relations.list(&a1))?;
    Ok(())
}
