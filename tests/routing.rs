// Copyright (c) 2024 Mike Tsao

use ensnare_routing::{
    cores::{DelayCore, EffectKind, GainCore, ReverbCore},
    graph::{AudioBuffer, ContextSettings, ProcessingContext, Target},
    prelude::*,
    routing::{Buses, EffectChain},
};
use float_cmp::approx_eq;
use std::sync::Arc;

fn running_context() -> ProcessingContext {
    ProcessingContext::new_with(ContextSettings {
        start_suspended: false,
        ..Default::default()
    })
}

#[test]
fn removing_the_middle_effect_splices_its_neighbors() {
    let mut ctx = ProcessingContext::default();
    let mut chain = EffectChain::new_with(&mut ctx, None).unwrap();
    chain
        .push(&mut ctx, GainCore::new_with(Normal::new(0.5)).into())
        .unwrap();
    chain.push(&mut ctx, ReverbCore::default().into()).unwrap();
    chain.push(&mut ctx, DelayCore::default().into()).unwrap();

    assert!(chain.remove(&mut ctx, EffectKind::Reverb).is_some());

    let kinds: Vec<EffectKind> = chain.iter().map(|fx| fx.kind()).collect();
    assert_eq!(kinds, vec![EffectKind::Gain, EffectKind::Delay]);

    let a = chain.get(EffectKind::Gain).unwrap();
    let c = chain.get(EffectKind::Delay).unwrap();
    assert_eq!(ctx.outputs(a.output()).unwrap(), &[Target::Node(c.input())]);
    assert_eq!(
        ctx.outputs(c.output()).unwrap(),
        &[Target::Node(chain.output())]
    );
    assert_eq!(ctx.outputs(chain.input()).unwrap(), &[Target::Node(a.input())]);
}

#[test]
fn new_bus_reaches_master() {
    let mut ctx = ProcessingContext::default();
    let mut buses = Buses::new_with(&mut ctx, None).unwrap();
    buses.create(&mut ctx, "fx", None).unwrap();

    let fx = buses.get("fx").unwrap();
    let master_input = buses.master().input();
    assert!(ctx
        .outputs(fx.post_gain())
        .unwrap()
        .contains(&Target::Node(master_input)));
}

#[test]
fn duplicate_bus_leaves_the_original_alone() {
    let mut ctx = ProcessingContext::default();
    let mut buses = Buses::new_with(&mut ctx, None).unwrap();
    let original = buses.create(&mut ctx, "fx", None).unwrap().input();
    let count = ctx.node_count();

    assert!(buses.create(&mut ctx, "fx", None).is_err());
    assert_eq!(buses.get("fx").unwrap().input(), original);
    assert_eq!(ctx.node_count(), count);
}

#[test]
fn aux_send_reaches_a_second_bus() {
    let mut ctx = running_context();
    let mut buses = Buses::new_with(&mut ctx, None).unwrap();
    let reverb_input = buses.create(&mut ctx, "reverb", None).unwrap().input();
    let drums = buses.create(&mut ctx, "drums", None).unwrap();
    let drums_input = drums.input();
    let send = drums.sends_mut().create(&mut ctx, reverb_input).unwrap();
    assert!(drums.sends().get(send).is_some());

    // Only the send feeds the reverb bus, so silencing the drums' own path to
    // master leaves exactly the send's contribution.
    drums.disconnect(&mut ctx);
    let buffer = Arc::new(AudioBuffer::new_with(ctx.sample_rate(), vec![vec![1.0; 32]]));
    let source = ctx.create_buffer_source(buffer, &Default::default());
    ctx.connect(source, drums_input).unwrap();
    ctx.start_source(source, Seconds::zero(), Seconds::zero(), None)
        .unwrap();

    let mut frames = [StereoSample::SILENCE; 16];
    ctx.render(&mut frames);
    assert!(frames.iter().all(|f| approx_eq!(f64, f.0 .0, 1.0, epsilon = 1e-9)));
}

#[test]
fn chain_path_stays_single_through_edits() {
    let mut ctx = ProcessingContext::default();
    let mut chain = EffectChain::new_with(&mut ctx, None).unwrap();
    for i in 0..4 {
        chain
            .insert(&mut ctx, GainCore::default().into(), i * 7)
            .unwrap();
    }
    chain.insert(&mut ctx, DelayCore::default().into(), 0).unwrap();
    while chain
        .remove_where(&mut ctx, |fx| fx.kind() == EffectKind::Gain)
        .is_some()
    {}
    assert_eq!(chain.len(), 1);

    let fx = chain.get(EffectKind::Delay).unwrap();
    assert_eq!(ctx.outputs(chain.input()).unwrap(), &[Target::Node(fx.input())]);
    assert_eq!(
        ctx.outputs(fx.output()).unwrap(),
        &[Target::Node(chain.output())]
    );

    let fx = chain.remove(&mut ctx, EffectKind::Delay);
    assert!(fx.is_some());
    assert!(chain.is_empty());
    assert_eq!(
        ctx.outputs(chain.input()).unwrap(),
        &[Target::Node(chain.output())]
    );
}

#[test]
fn bus_with_a_dead_target_is_refused_cleanly() {
    let mut ctx = running_context();
    let mut buses = Buses::new_with(&mut ctx, None).unwrap();
    let stale = buses.create(&mut ctx, "a", None).unwrap().input();
    assert!(buses.remove(&mut ctx, "a"));
    let before = ctx.node_count();

    assert!(buses
        .create(&mut ctx, "b", Some(Target::Node(stale)))
        .is_err());
    assert_eq!(ctx.node_count(), before);
    assert!(buses.get("b").is_none());
}
