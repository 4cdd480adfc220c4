//! port 连接协议
//!
//! 连接成功后 output 的资源被复制到 input。input 的资源可能经由所属 pass 的 output 继续导出
//! （exported / forward），所以要重新推导这个 pass 的 output，变化的部分继续沿连接向下游传播，
//! 直到不再变化。

use std::collections::VecDeque;

use petgraph::{algo::has_path_connecting, graphmap::DiGraphMap};

use super::RenderGraph;
use crate::{
    error::RgConnectError,
    pass::RgPassHandle,
    port::{RgPort, RgPortDirection, RgPortId},
    resource::{RgResourceHandle, RgResourceRef},
};

// 连接
impl RenderGraph<'_> {
    /// 把 `pass_a` 的 output 连接到 `pass_b` 的 input
    ///
    /// 被拒绝时 graph 不变。
    pub fn connect(
        &mut self,
        pass_a: RgPassHandle,
        output_handle: RgResourceHandle,
        pass_b: RgPassHandle,
        input_handle: RgResourceHandle,
    ) -> Result<(), RgConnectError> {
        self.connect_ports(RgPortId::output(pass_a, output_handle), RgPortId::input(pass_b, input_handle))
    }

    /// 连接两个 port，参数顺序无关
    ///
    /// # Panics
    /// port 不存在
    pub fn connect_ports(&mut self, a: RgPortId, b: RgPortId) -> Result<(), RgConnectError> {
        let result = self.validate_connection(a, b);
        if let Err(e) = &result {
            log::debug!("RenderGraph: reject connection {:?} <-> {:?}: {}", a, b, e);
            return result;
        }

        let (output, input) = if a.direction == RgPortDirection::Output { (a, b) } else { (b, a) };
        let resource = self.port_ref(output).resource;

        self.port_ref_mut(output).connection = Some(input);
        let input_port = self.port_ref_mut(input);
        input_port.connection = Some(output);
        input_port.resource = resource;

        self.propagate_from(input.pass);
        self.processed = false;

        log::debug!(
            "RenderGraph: connect \"{}\".{} -> \"{}\".{}",
            self.passes[output.pass].name(),
            self.port_ref(output).name(),
            self.passes[input.pass].name(),
            self.port_ref(input).name()
        );
        Ok(())
    }

    fn validate_connection(&self, a: RgPortId, b: RgPortId) -> Result<(), RgConnectError> {
        if a == b {
            return Err(RgConnectError::SamePort);
        }
        let port_a = self.port_ref(a);
        let port_b = self.port_ref(b);

        if a.pass == b.pass {
            return Err(RgConnectError::SamePass);
        }
        if a.direction == b.direction {
            return Err(RgConnectError::SameDirection);
        }

        let (output, input) = if a.direction == RgPortDirection::Output { (port_a, port_b) } else { (port_b, port_a) };
        if output.kind() != input.kind() {
            return Err(RgConnectError::KindMismatch {
                output: output.kind(),
                input: input.kind(),
            });
        }

        if let Some(existing) = port_a.connection().or(port_b.connection()) {
            return Err(RgConnectError::AlreadyConnected(existing));
        }

        let (output_pass, input_pass) = if a.direction == RgPortDirection::Output { (a.pass, b.pass) } else { (b.pass, a.pass) };
        // 已经存在 input_pass 到 output_pass 的路径时，新边会成环
        if has_path_connecting(&self.dependency_graph(), input_pass, output_pass, None) {
            return Err(RgConnectError::WouldCycle);
        }

        Ok(())
    }

    /// 断开 port 的连接，input 一侧变为空引用并向下游传播
    ///
    /// # Panics
    /// port 不存在
    pub fn disconnect(&mut self, port: RgPortId) -> Result<(), RgConnectError> {
        let Some(other) = self.port_ref(port).connection() else {
            return Err(RgConnectError::NotConnected(port));
        };
        let input = if port.direction == RgPortDirection::Input { port } else { other };

        self.port_ref_mut(port).connection = None;
        self.port_ref_mut(other).connection = None;
        let input_port = self.port_ref_mut(input);
        input_port.resource = RgResourceRef::empty(input_port.kind());

        self.propagate_from(input.pass);
        self.processed = false;
        Ok(())
    }

    /// 从 `start` 开始重新推导 output，并把变化沿连接传播到下游
    fn propagate_from(&mut self, start: RgPassHandle) {
        let mut worklist = VecDeque::from([start]);
        while let Some(pass) = worklist.pop_front() {
            let node = &mut self.passes[pass];
            let changed = node.refresh_outputs();

            let updates = changed
                .into_iter()
                .filter_map(|handle| {
                    let port = node.port(RgPortDirection::Output, handle)?;
                    Some((port.connection()?, port.resource()))
                })
                .collect::<Vec<_>>();

            for (downstream, resource) in updates {
                self.port_ref_mut(downstream).resource = resource;
                if !worklist.contains(&downstream.pass) {
                    worklist.push_back(downstream.pass);
                }
            }
        }
    }

    /// 按拓扑顺序从头推导所有 port 的资源
    ///
    /// 结果与逐次连接时的增量传播一致。
    pub fn refresh_all_ports(&mut self) {
        for pass in self.compute_execution_order() {
            let inputs = self.passes[pass]
                .inputs()
                .iter()
                .map(|port| match port.connection() {
                    Some(upstream) => self.port_ref(upstream).resource(),
                    None => RgResourceRef::empty(port.kind()),
                })
                .collect::<Vec<_>>();

            let node = &mut self.passes[pass];
            for (port, resource) in node.inputs.iter_mut().zip(inputs) {
                port.resource = resource;
            }
            node.refresh_outputs();
        }
    }
}

// port 查询
impl RenderGraph<'_> {
    /// port 不存在时返回 None
    pub fn port(&self, id: RgPortId) -> Option<&RgPort> {
        self.passes.get(id.pass)?.port(id.direction, id.handle)
    }

    pub fn input_port_by_name(&self, pass: RgPassHandle, name: &str) -> Option<RgPortId> {
        let port = self.passes.get(pass)?.inputs().iter().find(|p| p.name() == name)?;
        Some(RgPortId::input(pass, port.handle()))
    }

    pub fn output_port_by_name(&self, pass: RgPassHandle, name: &str) -> Option<RgPortId> {
        let port = self.passes.get(pass)?.outputs().iter().find(|p| p.name() == name)?;
        Some(RgPortId::output(pass, port.handle()))
    }

    fn port_ref(&self, id: RgPortId) -> &RgPort {
        self.port(id).unwrap_or_else(|| panic!("RenderGraph: unknown port {:?}", id))
    }

    fn port_ref_mut(&mut self, id: RgPortId) -> &mut RgPort {
        self.passes
            .get_mut(id.pass)
            .and_then(|node| node.port_mut(id.direction, id.handle))
            .unwrap_or_else(|| panic!("RenderGraph: unknown port {:?}", id))
    }

    /// pass 之间的依赖：边从上游 pass 指向下游 pass
    pub(crate) fn dependency_graph(&self) -> DiGraphMap<RgPassHandle, ()> {
        let mut graph = DiGraphMap::new();
        for &pass in &self.insertion_order {
            graph.add_node(pass);
        }
        for (pass, node) in self.passes.iter() {
            for upstream in node.inputs().iter().filter_map(|p| p.connection()) {
                graph.add_edge(upstream.pass, pass, ());
            }
        }
        graph
    }
}
